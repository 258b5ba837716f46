use crate::builder::{Mode, TunnelConfig};
use crate::error::{Error, Result};
use crate::platform::linux::sys::*;
use crate::platform::unix::Fd;
use libc::c_uint;
use nix::errno::Errno;
use std::ffi::CString;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};

/// A TUN/TAP device bound to one kernel interface.
pub struct DeviceImpl {
    pub(crate) fd: Fd,
    name: String,
    mode: Mode,
    packet_information: bool,
}

impl DeviceImpl {
    /// Opens the clone device and issues the `TUNSETIFF` request.
    ///
    /// `config` carries an already validated name. On any failure the opened
    /// descriptor is released before returning.
    pub(crate) fn new(config: TunnelConfig) -> Result<Self> {
        let requested = config.requested_name();
        log::debug!("Opening {TUN_DEVICE_PATH}...");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(TUN_DEVICE_PATH)
            .map_err(|source| Error::Open {
                path: TUN_DEVICE_PATH,
                source,
            })?;
        let fd = unsafe { Fd::new_unchecked(file.into_raw_fd()) };

        log::debug!(
            "Opening {} tunnel '{requested}'...",
            config.mode.name().to_uppercase()
        );
        let mut flags = config.mode.flag();
        if !config.packet_information {
            flags |= IFF_NO_PI;
        }
        let mut req = ifreq::new(requested, flags);
        if let Err(err) = unsafe { tunsetiff(fd.as_raw_fd(), &mut req as *mut _ as _) } {
            if err == Errno::EPERM {
                log::error!(
                    "Cannot open a {} tunnel because the operation is not permitted.",
                    config.mode.name().to_uppercase()
                );
            }
            return Err(Error::Configuration {
                name: requested.to_string(),
                source: io::Error::from(err),
            });
        }

        let name = req.name();
        log::info!("Tunnel '{name}' opened.");
        Ok(Self {
            fd,
            name,
            mode: config.mode,
            packet_information: config.packet_information,
        })
    }

    /// # Safety
    /// The fd passed in must be an owned file descriptor; in particular, it must be open.
    /// Ownership is taken even when the descriptor turns out not to be a TUN/TAP device.
    pub(crate) unsafe fn from_fd(fd: RawFd) -> Result<Self> {
        let fd = Fd::new_unchecked(fd);
        let mut req = ifreq::new("", 0);
        if let Err(err) = tungetiff(fd.as_raw_fd(), &mut req as *mut ifreq as *mut c_uint) {
            return Err(Error::Configuration {
                name: String::new(),
                source: io::Error::from(err),
            });
        }
        let flags = req.flags();
        let name = req.name();
        let Some(mode) = Mode::from_flags(flags) else {
            return Err(Error::Configuration {
                name,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown interface flags {flags:#x}"),
                ),
            });
        };
        let packet_information = match std::fs::read_to_string(tun_flags_path(&name)) {
            Ok(text) => match parse_tun_flags(&text) {
                Some(tun_flags) => tun_flags & IFF_NO_PI == 0,
                None => {
                    return Err(Error::Configuration {
                        name,
                        source: io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("unexpected tun_flags {:?}", text.trim()),
                        ),
                    })
                }
            },
            Err(e) => {
                log::warn!("Cannot read tun_flags of '{name}' ({e}), assuming no packet information.");
                false
            }
        };
        log::debug!("Adopted {mode} tunnel '{name}' on fd {}", fd.as_raw_fd());
        Ok(Self {
            fd,
            name,
            mode,
            packet_information,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(fd: Fd, name: &str, mode: Mode) -> Self {
        Self {
            fd,
            name: name.to_string(),
            mode,
            packet_information: false,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }
    pub(crate) fn packet_information(&self) -> bool {
        self.packet_information
    }
    pub(crate) fn is_closed(&self) -> bool {
        self.fd.is_closed()
    }

    fn open_fd(&self) -> Result<&Fd> {
        if self.fd.is_closed() {
            return Err(Error::Closed);
        }
        Ok(&self.fd)
    }

    pub(crate) fn is_nonblocking(&self) -> Result<bool> {
        Ok(self.open_fd()?.is_nonblocking()?)
    }
    /// Moves this Device into or out of nonblocking mode.
    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        Ok(self.open_fd()?.set_nonblocking(nonblocking)?)
    }

    /// Recv a packet from tun device
    pub(crate) fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.open_fd()?.read(buf)?)
    }

    /// Send a packet to tun device; the whole buffer is one frame.
    pub(crate) fn send(&self, buf: &[u8]) -> Result<usize> {
        let len = self.open_fd()?.write(buf)?;
        if len != buf.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {len} of {} bytes", buf.len()),
            )));
        }
        Ok(len)
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        if self.fd.is_closed() {
            return Ok(());
        }
        let rs = self.fd.close();
        log::info!("Tunnel '{}' closed.", self.name);
        rs.map_err(Error::Io)
    }

    /// Retrieves the interface index for the network interface.
    pub(crate) fn if_index(&self) -> Result<u32> {
        let if_name = CString::new(self.name.as_str())
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        match unsafe { libc::if_nametoindex(if_name.as_ptr()) } {
            0 => Err(Error::Io(io::Error::last_os_error())),
            index => Ok(index),
        }
    }
}

impl AsRawFd for DeviceImpl {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl IntoRawFd for DeviceImpl {
    fn into_raw_fd(mut self) -> RawFd {
        self.fd.detach()
    }
}

impl Drop for DeviceImpl {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close tunnel '{}': {e}", self.name);
        }
    }
}
