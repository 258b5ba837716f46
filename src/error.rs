//! Error types for tunnel handles.

use std::io;
use thiserror::Error;

/// Result type alias for tunnel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening or using a [`Tunnel`](crate::Tunnel).
///
/// Every failure surfaces to the caller; nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// The device node could not be opened (missing kernel module, absent node,
    /// permission denied).
    #[error("failed to open {path}: {source}")]
    Open {
        path: &'static str,
        #[source]
        source: io::Error,
    },

    /// The requested interface name is invalid or the kernel rejected the
    /// mode/name configuration request.
    #[error("failed to configure interface {name:?}: {source}")]
    Configuration {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A mode selector string other than `tun` or `tap`.
    #[error("{0:?} is not a valid tunnel type")]
    InvalidMode(String),

    /// The handle has already been closed.
    #[error("tunnel is closed")]
    Closed,

    /// The descriptor is non-blocking and no frame (or no buffer space) is ready.
    #[error("operation would block")]
    WouldBlock,

    /// Any other transport failure, including short writes.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    /// Check if the error is a permission-related error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.os_source(), Some(e) if e.kind() == io::ErrorKind::PermissionDenied)
    }

    /// Check if the error is a not-found error (usually an absent device node)
    pub fn is_not_found(&self) -> bool {
        matches!(self.os_source(), Some(e) if e.kind() == io::ErrorKind::NotFound)
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self, Error::WouldBlock)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }

    fn os_source(&self) -> Option<&io::Error> {
        match self {
            Error::Open { source, .. } | Error::Configuration { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            Error::InvalidMode(_) | Error::Closed | Error::WouldBlock => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Transport errors; `WouldBlock` is lifted into its own variant.
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::WouldBlock {
            Error::WouldBlock
        } else {
            Error::Io(e)
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::WouldBlock => io::Error::from(io::ErrorKind::WouldBlock),
            Error::Closed => io::Error::new(io::ErrorKind::NotConnected, Error::Closed),
            Error::InvalidMode(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            Error::Open { .. } | Error::Configuration { .. } => {
                let kind = e.os_source().map_or(io::ErrorKind::Other, io::Error::kind);
                io::Error::new(kind, e)
            }
        }
    }
}
