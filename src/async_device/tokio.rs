use std::io;
use std::task::{Context, Poll};

use crate::error::{Error, Result};
use crate::platform::DeviceImpl;
use ::tokio::io::unix::AsyncFd as TokioAsyncFd;
use ::tokio::io::Interest;

/// An async TUN/TAP handle driven by the Tokio reactor.
///
/// This type does not provide a split method, because this functionality can be achieved by instead wrapping the handle in an Arc.
///
/// # Examples
///
/// ```no_run
/// use tun_handle::{Mode, TunnelBuilder};
///
/// #[tokio::main]
/// async fn main() -> tun_handle::Result<()> {
///     let dev = TunnelBuilder::new().mode(Mode::Tun).name("tun7").build_async()?;
///
///     let mut buf = [0u8; 1500];
///     let n = dev.recv(&mut buf).await?;
///     println!("Received {} bytes: {:?}", n, &buf[..n]);
///
///     // Reflect it back (replace with a real IP packet)
///     dev.send(&buf[..n]).await?;
///     Ok(())
/// }
/// ```
pub struct AsyncTunnel(pub(crate) TokioAsyncFd<DeviceImpl>);

impl AsyncTunnel {
    /// Polls the I/O handle for readability.
    ///
    /// # Caveats
    ///
    /// Note that on multiple calls to a `poll_*` method in the `recv` direction, only the
    /// `Waker` from the `Context` passed to the most recent call will be scheduled to
    /// receive a wakeup.
    pub fn poll_readable(&self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.0.poll_read_ready(cx).map_ok(|_| ()).map_err(Error::from)
    }
    /// Attempts to receive a single frame from the device.
    ///
    /// # Return value
    ///
    /// The function returns:
    ///
    /// * `Poll::Pending` if the device is not ready to read
    /// * `Poll::Ready(Ok(n))` if a frame of `n` bytes was read into `buf`
    /// * `Poll::Ready(Err(e))` if an error is encountered.
    pub fn poll_recv(&self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<Result<usize>> {
        loop {
            return match self.0.poll_read_ready(cx) {
                Poll::Ready(Ok(mut rs)) => {
                    let n = match rs.try_io(|dev| to_io(dev.get_ref().recv(buf))) {
                        Ok(rs) => rs?,
                        Err(_) => continue,
                    };
                    Poll::Ready(Ok(n))
                }
                Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
                Poll::Pending => Poll::Pending,
            };
        }
    }
    /// Polls the I/O handle for writability.
    pub fn poll_writable(&self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.0.poll_write_ready(cx).map_ok(|_| ()).map_err(Error::from)
    }
    /// Attempts to send a frame to the device.
    ///
    /// * `Poll::Pending` if the device is not available to write
    /// * `Poll::Ready(Ok(n))` `n` is the number of bytes sent
    /// * `Poll::Ready(Err(e))` if an error is encountered.
    pub fn poll_send(&self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>> {
        loop {
            return match self.0.poll_write_ready(cx) {
                Poll::Ready(Ok(mut rs)) => {
                    let n = match rs.try_io(|dev| to_io(dev.get_ref().send(buf))) {
                        Ok(rs) => rs?,
                        Err(_) => continue,
                    };
                    Poll::Ready(Ok(n))
                }
                Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
                Poll::Pending => Poll::Pending,
            };
        }
    }
}

impl AsyncTunnel {
    pub(crate) fn new_dev(device: DeviceImpl) -> Result<Self> {
        device.set_nonblocking(true)?;
        Ok(Self(TokioAsyncFd::new(device)?))
    }
    pub(crate) fn into_device(self) -> DeviceImpl {
        self.0.into_inner()
    }

    pub(crate) async fn read_with<R>(
        &self,
        mut op: impl FnMut(&DeviceImpl) -> Result<R>,
    ) -> Result<R> {
        Ok(self
            .0
            .async_io(Interest::READABLE.add(Interest::ERROR), |device| {
                to_io(op(device))
            })
            .await?)
    }
    pub(crate) async fn write_with<R>(
        &self,
        mut op: impl FnMut(&DeviceImpl) -> Result<R>,
    ) -> Result<R> {
        Ok(self
            .0
            .async_io(Interest::WRITABLE, |device| to_io(op(device)))
            .await?)
    }

    pub(crate) fn try_read_io<R>(&self, f: impl FnOnce(&DeviceImpl) -> Result<R>) -> Result<R> {
        Ok(self
            .0
            .try_io(Interest::READABLE.add(Interest::ERROR), |device| {
                to_io(f(device))
            })?)
    }

    pub(crate) fn try_write_io<R>(&self, f: impl FnOnce(&DeviceImpl) -> Result<R>) -> Result<R> {
        Ok(self.0.try_io(Interest::WRITABLE, |device| to_io(f(device)))?)
    }

    pub(crate) fn get_ref(&self) -> &DeviceImpl {
        self.0.get_ref()
    }
}

/// Tokio clears readiness only when it sees `io::ErrorKind::WouldBlock`.
fn to_io<R>(rs: Result<R>) -> io::Result<R> {
    rs.map_err(io::Error::from)
}
