//! Capability traits for frame-oriented, multiplexable I/O sources.
//!
//! A reactor or readiness loop that only needs "read a frame, write a frame,
//! and give me something to wait on" should accept these traits instead of a
//! concrete [`Tunnel`](crate::Tunnel).

use std::os::fd::BorrowedFd;

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::MAX_FRAME_SIZE;

/// A source of whole frames.
pub trait FrameRead {
    /// Reads one frame into `buf`, returning its length.
    ///
    /// Bytes beyond `buf.len()` are discarded.
    fn recv(&self, buf: &mut [u8]) -> Result<usize>;

    /// Reads one frame of at most `max_size` bytes into a fresh buffer.
    ///
    /// `max_size` is capped at [`MAX_FRAME_SIZE`]. The returned buffer is
    /// sized to the frame, not to `max_size`.
    fn receive(&self, max_size: usize) -> Result<Bytes> {
        let mut buf = receive_buffer(max_size);
        let len = self.recv(&mut buf)?;
        Ok(Bytes::copy_from_slice(&buf[..len]))
    }
}

/// Scratch space for one frame of at most `max_size` bytes.
pub(crate) fn receive_buffer(max_size: usize) -> BytesMut {
    BytesMut::zeroed(max_size.min(MAX_FRAME_SIZE))
}

/// A sink accepting whole frames.
pub trait FrameWrite {
    /// Writes `frame` as one unit, returning the number of bytes accepted.
    fn send(&self, frame: &[u8]) -> Result<usize>;
}

/// Something that can be placed into a select/poll/epoll watch set.
pub trait Waitable {
    /// The descriptor to watch, or [`Error::Closed`](crate::Error::Closed)
    /// once there is nothing left to watch.
    fn waitable_fd(&self) -> Result<BorrowedFd<'_>>;
}

/// Readable, writable and waitable: everything a reactor needs.
pub trait FrameStream: FrameRead + FrameWrite + Waitable {}

impl<T: FrameRead + FrameWrite + Waitable + ?Sized> FrameStream for T {}
