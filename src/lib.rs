#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
# tun-handle: Linux TUN/TAP interface handles

Creates a TUN (layer 3) or TAP (layer 2) virtual interface through the
kernel's `/dev/net/tun` clone device and exchanges whole frames with it.
Every successful receive yields exactly one packet (TUN) or one Ethernet
frame (TAP); every send hands one to the kernel.

The handle does not configure addresses, routes, MTU or link state. Bring the
interface up with your usual tooling (`ip link`, netlink) once it exists.

## Quick Start

```no_run
use tun_handle::{Mode, Tunnel};

let tun = Tunnel::open(Mode::Tun, Some("tun7"))?;
println!("opened {}", tun.name());

let mut buf = [0u8; 1500];
loop {
    let len = tun.recv(&mut buf)?;
    println!("Received packet: {:?}", &buf[..len]);
}
# Ok::<(), tun_handle::Error>(())
```

More options are on [`TunnelBuilder`]:

```no_run
use tun_handle::{Mode, TunnelBuilder};

let tap = TunnelBuilder::new()
    .mode(Mode::Tap)
    .name("lab%d")
    .build()?;
assert!(tap.name().starts_with("lab"));
# Ok::<(), tun_handle::Error>(())
```

## Event loops

A [`Tunnel`] can be switched to non-blocking mode and placed in any
`select`/`poll`/`epoll` set through [`Waitable::waitable_fd`]. Code that only
needs those capabilities can accept a [`FrameStream`].

With the `async_tokio` feature, [`AsyncTunnel`] registers the descriptor with
the Tokio reactor:

```no_run
# #[cfg(feature = "async_tokio")]
# #[tokio::main]
# async fn main() -> tun_handle::Result<()> {
use tun_handle::TunnelBuilder;

let dev = TunnelBuilder::new().build_async()?;
let frame = dev.receive(1500).await?;
println!("Received: {:?}", frame);
# Ok(())
# }
# #[cfg(not(feature = "async_tokio"))]
# fn main() {}
```

## Privileges

Creating an interface needs `CAP_NET_ADMIN` and access to `/dev/net/tun`
(`modprobe tun`). Check [`Error::is_permission_denied`] and
[`Error::is_not_found`] to tell those cases apart.

## Feature Flags

- **`async`** (alias for `async_tokio`): Enable async support with Tokio runtime
- **`async_tokio`**: Use Tokio for async I/O operations
*/

#[cfg(not(any(target_os = "linux", target_os = "android")))]
compile_error! {"tun-handle only supports Linux and Android"}

pub use crate::builder::{Mode, TunnelBuilder};
pub use crate::error::{Error, Result};
pub use crate::platform::{Tunnel, TUN_DEVICE_PATH};
pub use crate::stream::{FrameRead, FrameStream, FrameWrite, Waitable};

#[cfg_attr(docsrs, doc(cfg(feature = "async_tokio")))]
#[cfg(feature = "async_tokio")]
mod async_device;

#[cfg_attr(docsrs, doc(cfg(feature = "async_tokio")))]
#[cfg(feature = "async_tokio")]
pub use async_device::AsyncTunnel;

mod builder;
mod error;
mod platform;
mod stream;

/// Buffer size used by [`Tunnel::receive_frame`].
///
/// Matches the usual Ethernet MTU. Frames longer than this are truncated;
/// use [`Tunnel::receive`] with a larger size for jumbo frames.
pub const DEFAULT_FRAME_SIZE: usize = 1500;

/// Largest frame the driver can hand out: a 65535-byte MTU behind an
/// Ethernet header with one VLAN tag and the packet information prefix.
///
/// [`Tunnel::receive`] never allocates more than this.
pub const MAX_FRAME_SIZE: usize = 65535 + 18 + PACKET_INFORMATION_LENGTH;

/// Length of the packet information header.
///
/// When `packet_information` is enabled in [`TunnelBuilder`], every frame
/// starts with a 4-byte `flags` + `proto` prefix written by the kernel. The
/// `proto` field is the EtherType of the payload in network byte order.
///
/// # Example
///
/// ```no_run
/// use tun_handle::{TunnelBuilder, PACKET_INFORMATION_LENGTH};
///
/// let dev = TunnelBuilder::new().packet_information(true).build()?;
/// let mut buf = vec![0u8; PACKET_INFORMATION_LENGTH + 1500];
/// let len = dev.recv(&mut buf)?;
/// let packet = &buf[PACKET_INFORMATION_LENGTH..len];
/// # let _ = packet;
/// # Ok::<(), tun_handle::Error>(())
/// ```
pub const PACKET_INFORMATION_LENGTH: usize = 4;
