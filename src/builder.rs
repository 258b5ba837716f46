/*!
# Tunnel Builder Module

This module provides the [`TunnelBuilder`] struct for configuring and creating TUN/TAP handles.

## Overview

The builder collects the construction parameters before the device node is opened:
- Operating mode ([`Mode::Tun`] or [`Mode::Tap`])
- Requested interface name (or a `%d` template, or nothing at all)
- Whether the kernel packet information prefix is kept

Assigning addresses, bringing the link up and routing are left to external tools
(`ip`, `ifconfig`, ...), invoked by the caller once the interface exists.

## Basic Usage

```no_run
use tun_handle::{Mode, TunnelBuilder};

let tun = TunnelBuilder::new()
    .mode(Mode::Tun)
    .name("tun7")
    .build()?;
println!("opened {}", tun.name());
# Ok::<(), tun_handle::Error>(())
```

## Error Handling

`build()` fails with [`Error::Open`] when `/dev/net/tun` cannot be opened and with
[`Error::Configuration`] when the requested name is unusable or the kernel refuses
the request. No half-initialized handle is ever returned.
*/

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::platform::linux::sys::IFNAMSIZ;
use crate::platform::{DeviceImpl, Tunnel};

/// The layer at which the virtual interface operates.
///
/// # TUN - Network Layer
///
/// Frames exchanged are raw IP packets (v4 or v6) with no link-layer header.
/// This is the default.
///
/// # TAP - Data Link Layer
///
/// Frames exchanged are complete Ethernet frames, including destination and
/// source MAC addresses and the EtherType.
///
/// The mode is chosen at construction and never changes; a TUN handle never
/// yields link-layer framed data and a TAP handle always does.
///
/// # Examples
///
/// ```
/// use tun_handle::Mode;
///
/// let mode: Mode = "tap".parse().unwrap();
/// assert_eq!(mode, Mode::Tap);
/// assert_eq!(Mode::default(), Mode::Tun);
/// ```
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    /// IP packets, no link-layer header.
    #[default]
    Tun,
    /// Ethernet frames including the link-layer header.
    Tap,
}

impl Mode {
    /// Get the mode name.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Tun => "tun",
            Mode::Tap => "tap",
        }
    }

    /// The `IFF_*` flag requested from the kernel for this mode.
    pub(crate) fn flag(&self) -> libc::c_short {
        use crate::platform::linux::sys::{IFF_TAP, IFF_TUN};
        match self {
            Mode::Tun => IFF_TUN,
            Mode::Tap => IFF_TAP,
        }
    }

    /// Recover the mode from the flags reported by the kernel.
    pub(crate) fn from_flags(flags: libc::c_short) -> Option<Mode> {
        use crate::platform::linux::sys::{IFF_TAP, IFF_TUN};
        match flags & (IFF_TUN | IFF_TAP) {
            IFF_TUN => Some(Mode::Tun),
            IFF_TAP => Some(Mode::Tap),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Mode> {
        if s.eq_ignore_ascii_case("tun") {
            Ok(Mode::Tun)
        } else if s.eq_ignore_ascii_case("tap") {
            Ok(Mode::Tap)
        } else {
            Err(Error::InvalidMode(s.to_string()))
        }
    }
}

/// Configuration for a TUN/TAP handle.
#[derive(Clone, Default, Debug)]
pub(crate) struct TunnelConfig {
    /// The requested name of the interface; empty lets the kernel pick one.
    pub(crate) dev_name: Option<String>,
    pub(crate) mode: Mode,
    /// Keep the 4-byte `tun_pi` header in front of every frame.
    pub(crate) packet_information: bool,
}

impl TunnelConfig {
    /// The requested name, or the empty string when none was given.
    pub(crate) fn requested_name(&self) -> &str {
        self.dev_name.as_deref().unwrap_or_default()
    }
}

/// Checks that `name` fits the kernel's fixed-size name field.
///
/// The empty name is valid and asks the kernel to assign `tunN`/`tapN`.
/// Anything else the kernel dislikes (slashes, whitespace, collisions) is
/// reported by the configuration request itself.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let reason = if name.len() > IFNAMSIZ - 1 {
        format!(
            "name is {} bytes long, the limit is {}",
            name.len(),
            IFNAMSIZ - 1
        )
    } else if name.as_bytes().contains(&0) {
        "name contains a NUL byte".to_string()
    } else {
        return Ok(());
    };
    Err(Error::Configuration {
        name: name.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidInput, reason),
    })
}

/// A builder for creating a [`Tunnel`].
///
/// # Examples
///
/// Creating a TAP interface whose name the kernel picks from a template:
///
/// ````no_run
/// use tun_handle::{Mode, TunnelBuilder};
///
/// fn main() -> tun_handle::Result<()> {
///     let tap = TunnelBuilder::new()
///         .mode(Mode::Tap)
///         .name("lab%d")
///         .build()?;
///     assert!(tap.name().starts_with("lab"));
///     Ok(())
/// }
/// ````
#[derive(Default, Debug, Clone)]
pub struct TunnelBuilder {
    dev_name: Option<String>,
    mode: Option<Mode>,
    packet_information: Option<bool>,
}

impl TunnelBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    /// Sets the requested interface name.
    ///
    /// The name may contain `%d`, which the kernel replaces with the first free
    /// index. An empty name has the same effect as not calling this method.
    pub fn name<S: Into<String>>(mut self, dev_name: S) -> Self {
        self.dev_name = Some(dev_name.into());
        self
    }
    /// Sets the operating mode. Defaults to [`Mode::Tun`].
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }
    /// Enables or disables the kernel packet information header.
    ///
    /// This option is disabled by default (`false`): frames are raw IP packets
    /// or Ethernet frames. When enabled, every frame read or written carries a
    /// [`PACKET_INFORMATION_LENGTH`](crate::PACKET_INFORMATION_LENGTH)-byte
    /// prefix of flags and protocol number.
    pub fn packet_information(mut self, packet_information: bool) -> Self {
        self.packet_information = Some(packet_information);
        self
    }
    pub(crate) fn build_config(&mut self) -> TunnelConfig {
        TunnelConfig {
            dev_name: self.dev_name.take().filter(|name| !name.is_empty()),
            mode: self.mode.take().unwrap_or_default(),
            packet_information: self.packet_information.take().unwrap_or(false),
        }
    }
    /// Opens the device node and configures the interface.
    pub fn build(mut self) -> Result<Tunnel> {
        let config = self.build_config();
        validate_name(config.requested_name())?;
        let device = DeviceImpl::new(config)?;
        Ok(Tunnel::from_device(device))
    }
    /// Builds a tunnel and registers it with the Tokio reactor.
    #[cfg(feature = "async_tokio")]
    pub fn build_async(self) -> Result<crate::AsyncTunnel> {
        crate::AsyncTunnel::new(self.build()?)
    }
}
