pub(crate) mod unix;

pub(crate) mod linux;
pub use self::linux::sys::TUN_DEVICE_PATH;
pub(crate) use self::linux::DeviceImpl;

use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, IntoRawFd, RawFd};

use bytes::Bytes;

use crate::builder::{Mode, TunnelBuilder};
use crate::error::{Error, Result};
use crate::stream::{FrameRead, FrameWrite, Waitable};
use crate::DEFAULT_FRAME_SIZE;

/// An open TUN/TAP interface with synchronous frame I/O.
///
/// The handle exclusively owns one descriptor on `/dev/net/tun`. Each
/// [`send`](Tunnel::send) hands one frame to the kernel and each
/// [`recv`](Tunnel::recv) returns one frame from it. The descriptor is
/// released by [`close`](Tunnel::close) or, at the latest, when the handle is
/// dropped.
///
/// `send` and `recv` take `&self`, so one thread may send while another
/// receives through an `Arc<Tunnel>`. Two threads receiving at once is not
/// supported.
///
/// # Examples
///
/// ```no_run
/// use tun_handle::{Mode, Tunnel};
///
/// let tun = Tunnel::open(Mode::Tun, Some("tun7"))?;
/// loop {
///     let frame = tun.receive_frame()?;
///     println!("{} bytes from {}", frame.len(), tun.name());
/// }
/// # Ok::<(), tun_handle::Error>(())
/// ```
///
/// The remaining options go through [`Tunnel::builder`]:
///
/// ```no_run
/// use tun_handle::{Mode, Tunnel};
///
/// let tap = Tunnel::builder()
///     .mode(Mode::Tap)
///     .packet_information(true)
///     .build()?;
/// assert!(tap.packet_information());
/// # Ok::<(), tun_handle::Error>(())
/// ```
pub struct Tunnel(pub(crate) DeviceImpl);

impl Tunnel {
    /// Opens `/dev/net/tun` and creates an interface in `mode`.
    ///
    /// With `None` or an empty name the kernel assigns one (`tun0`, `tap1`, ...).
    pub fn open(mode: Mode, name: Option<&str>) -> Result<Tunnel> {
        let mut builder = TunnelBuilder::new().mode(mode);
        if let Some(name) = name {
            builder = builder.name(name);
        }
        builder.build()
    }
    /// Returns a builder for the remaining construction options.
    pub fn builder() -> TunnelBuilder {
        TunnelBuilder::new()
    }
    pub(crate) fn from_device(device: DeviceImpl) -> Self {
        Tunnel(device)
    }
    /// Adopts a descriptor that is already attached to a TUN/TAP interface,
    /// e.g. one passed down by a privileged parent process.
    ///
    /// The interface name, mode and packet information setting are read back
    /// from the kernel.
    ///
    /// # Safety
    /// - The file descriptor (`fd`) must be an owned file descriptor.
    /// - It must be valid and open.
    ///
    /// Ownership is taken even if the call fails; the descriptor is then closed.
    pub unsafe fn from_fd(fd: RawFd) -> Result<Tunnel> {
        Ok(Tunnel(DeviceImpl::from_fd(fd)?))
    }
    /// The interface name assigned by the kernel.
    pub fn name(&self) -> &str {
        self.0.name()
    }
    pub fn mode(&self) -> Mode {
        self.0.mode()
    }
    /// Whether frames carry the kernel packet information prefix.
    pub fn packet_information(&self) -> bool {
        self.0.packet_information()
    }
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
    /// Receives one frame into the provided buffer.
    ///
    /// Returns the number of bytes read. A frame longer than `buf` is
    /// truncated; the excess is discarded by the kernel.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.0.recv(buf)
    }
    /// Receives one frame of at most `max_size` bytes.
    ///
    /// `max_size` is capped at [`MAX_FRAME_SIZE`](crate::MAX_FRAME_SIZE).
    pub fn receive(&self, max_size: usize) -> Result<Bytes> {
        FrameRead::receive(self, max_size)
    }
    /// Receives one frame of at most [`DEFAULT_FRAME_SIZE`] bytes.
    pub fn receive_frame(&self) -> Result<Bytes> {
        self.receive(DEFAULT_FRAME_SIZE)
    }
    /// Sends `frame` to the kernel as a single packet.
    ///
    /// Returns the number of bytes written, always `frame.len()`; a short
    /// write is reported as [`Error::Io`].
    pub fn send(&self, frame: &[u8]) -> Result<usize> {
        self.0.send(frame)
    }
    /// Releases the descriptor.
    ///
    /// Closing an already closed tunnel is a no-op. Afterwards every I/O
    /// call fails with [`Error::Closed`].
    pub fn close(&mut self) -> Result<()> {
        self.0.close()
    }
    /// Checks whether the device is currently operating in nonblocking mode.
    pub fn is_nonblocking(&self) -> Result<bool> {
        self.0.is_nonblocking()
    }
    /// Sets the nonblocking mode for the device.
    ///
    /// In nonblocking mode `recv` and `send` fail with [`Error::WouldBlock`]
    /// instead of waiting; wait for readiness on [`Waitable::waitable_fd`].
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.0.set_nonblocking(nonblocking)
    }
    /// The kernel interface index of [`name`](Tunnel::name).
    pub fn if_index(&self) -> Result<u32> {
        self.0.if_index()
    }
}

impl FrameRead for Tunnel {
    fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        Tunnel::recv(self, buf)
    }
}

impl FrameWrite for Tunnel {
    fn send(&self, frame: &[u8]) -> Result<usize> {
        Tunnel::send(self, frame)
    }
}

impl Waitable for Tunnel {
    fn waitable_fd(&self) -> Result<BorrowedFd<'_>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(unsafe { BorrowedFd::borrow_raw(self.as_raw_fd()) })
    }
}

impl io::Read for &Tunnel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(Tunnel::recv(self, buf)?)
    }
}

impl io::Read for Tunnel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl io::Write for &Tunnel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(Tunnel::send(self, buf)?)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Tunnel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRawFd for Tunnel {
    /// The raw descriptor, or `-1` once the tunnel is closed.
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

impl IntoRawFd for Tunnel {
    fn into_raw_fd(self) -> RawFd {
        self.0.into_raw_fd()
    }
}

impl fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunnel")
            .field("mode", &self.mode())
            .field("name", &self.name())
            .field("fd", &self.as_raw_fd())
            .finish()
    }
}
