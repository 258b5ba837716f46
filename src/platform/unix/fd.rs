use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use libc::{self, fcntl, F_GETFL, O_NONBLOCK};

/// POSIX file descriptor support for `io` traits.
///
/// The descriptor is released exactly once: by [`Fd::close`], by
/// [`Fd::detach`] handing it away, or on drop.
pub(crate) struct Fd {
    pub(crate) inner: RawFd,
}

impl Fd {
    /// # Safety
    /// `value` must be an open descriptor owned by nobody else.
    pub(crate) unsafe fn new_unchecked(value: RawFd) -> Self {
        Fd { inner: value }
    }
    pub(crate) fn is_closed(&self) -> bool {
        self.inner < 0
    }
    /// Closes the descriptor. Calling this again is a no-op.
    ///
    /// The descriptor is considered released even if `close(2)` reports an
    /// error; retrying could close an unrelated, reused descriptor.
    pub(crate) fn close(&mut self) -> io::Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let fd = std::mem::replace(&mut self.inner, -1);
        if unsafe { libc::close(fd) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
    /// Gives up ownership; the caller becomes responsible for closing.
    pub(crate) fn detach(&mut self) -> RawFd {
        std::mem::replace(&mut self.inner, -1)
    }
    pub(crate) fn is_nonblocking(&self) -> io::Result<bool> {
        unsafe {
            let flags = fcntl(self.inner, F_GETFL);
            if flags == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok((flags & O_NONBLOCK) != 0)
        }
    }
    /// Enable non-blocking mode
    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let mut nonblocking = nonblocking as libc::c_int;
        match unsafe { libc::ioctl(self.as_raw_fd(), libc::FIONBIO, &mut nonblocking) } {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    #[inline]
    pub(crate) fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let fd = self.as_raw_fd();
        let amount = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) };
        if amount < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(amount as usize)
    }

    #[inline]
    pub(crate) fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let fd = self.as_raw_fd();
        let amount = unsafe { libc::write(fd, buf.as_ptr() as *const _, buf.len()) };
        if amount < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(amount as usize)
    }
}

impl AsRawFd for Fd {
    fn as_raw_fd(&self) -> RawFd {
        self.inner
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close descriptor: {e:?}");
        }
    }
}
