use std::fmt;
use std::os::fd::{AsRawFd, RawFd};

use bytes::Bytes;

use crate::builder::Mode;
use crate::error::{Error, Result};
use crate::platform::Tunnel;
use crate::stream::receive_buffer;
use crate::DEFAULT_FRAME_SIZE;

mod tokio;
pub use self::tokio::AsyncTunnel;

impl AsRawFd for AsyncTunnel {
    fn as_raw_fd(&self) -> RawFd {
        self.get_ref().as_raw_fd()
    }
}

impl fmt::Debug for AsyncTunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTunnel")
            .field("mode", &self.mode())
            .field("name", &self.name())
            .field("fd", &self.as_raw_fd())
            .finish()
    }
}

impl AsyncTunnel {
    /// Switches `tunnel` to non-blocking mode and registers it with the
    /// current Tokio reactor.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// [`Error::Closed`] if the tunnel was already closed.
    pub fn new(tunnel: Tunnel) -> Result<AsyncTunnel> {
        if tunnel.is_closed() {
            return Err(Error::Closed);
        }
        AsyncTunnel::new_dev(tunnel.0)
    }
    /// Deregisters the descriptor and returns the synchronous handle.
    ///
    /// The descriptor stays in non-blocking mode.
    pub fn into_inner(self) -> Tunnel {
        Tunnel::from_device(self.into_device())
    }
    pub fn name(&self) -> &str {
        self.get_ref().name()
    }
    pub fn mode(&self) -> Mode {
        self.get_ref().mode()
    }
    /// Waits for the device to become readable.
    ///
    /// This function is usually paired with `try_recv()`.
    ///
    /// The function may complete without the device being readable. This is a
    /// false-positive and attempting a `try_recv()` will return with
    /// [`Error::WouldBlock`].
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. Once a readiness event occurs, the method
    /// will continue to return immediately until the readiness event is
    /// consumed by an attempt to read that fails with `WouldBlock` or
    /// `Poll::Pending`.
    pub async fn readable(&self) -> Result<()> {
        Ok(self.0.readable().await.map(|_| ())?)
    }
    /// Waits for the device to become writable.
    ///
    /// This function is usually paired with `try_send()`.
    pub async fn writable(&self) -> Result<()> {
        Ok(self.0.writable().await.map(|_| ())?)
    }
    /// Receives a single frame from the device.
    /// On success, returns the number of bytes read.
    ///
    /// If a frame is too long to fit in the supplied buffer, excess bytes are
    /// discarded.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.read_with(|device| device.recv(buf)).await
    }
    /// Receives a single frame of at most `max_size` bytes.
    ///
    /// `max_size` is capped at [`MAX_FRAME_SIZE`](crate::MAX_FRAME_SIZE).
    pub async fn receive(&self, max_size: usize) -> Result<Bytes> {
        let mut buf = receive_buffer(max_size);
        let len = self.recv(&mut buf).await?;
        Ok(Bytes::copy_from_slice(&buf[..len]))
    }
    /// Receives a single frame of at most [`DEFAULT_FRAME_SIZE`] bytes.
    pub async fn receive_frame(&self) -> Result<Bytes> {
        self.receive(DEFAULT_FRAME_SIZE).await
    }
    /// Tries to receive a single frame from the device.
    ///
    /// When there is no pending frame, [`Error::WouldBlock`] is returned.
    /// This function is usually paired with `readable()`.
    pub fn try_recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.try_read_io(|device| device.recv(buf))
    }
    /// Send a frame to the device
    ///
    /// # Return
    /// On success, the number of bytes sent is returned, otherwise, the encountered error is returned.
    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.write_with(|device| device.send(buf)).await
    }
    /// Tries to send a frame to the device.
    ///
    /// When the device buffer is full, [`Error::WouldBlock`] is returned.
    /// This function is usually paired with `writable()`.
    pub fn try_send(&self, buf: &[u8]) -> Result<usize> {
        self.try_write_io(|device| device.send(buf))
    }
}
