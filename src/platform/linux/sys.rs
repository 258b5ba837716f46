//! Fixed platform table for the Linux TUN/TAP driver (`linux/if_tun.h`, `linux/if.h`).

use libc::{c_char, c_int, c_short, c_uchar, c_uint, c_ulong, c_ushort, c_void, sockaddr};
use nix::{ioctl_read, ioctl_write_int};
use std::path::{Path, PathBuf};

/// The TUN/TAP clone device.
pub const TUN_DEVICE_PATH: &str = "/dev/net/tun";

/// Size of the kernel name field, terminator included.
pub const IFNAMSIZ: usize = 16;

pub const IFF_TUN: c_short = 0x0001;
pub const IFF_TAP: c_short = 0x0002;
pub const IFF_NO_PI: c_short = 0x1000;

#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ifmap {
    pub mem_start: c_ulong,
    pub mem_end: c_ulong,
    pub base_addr: c_ushort,
    pub irq: c_uchar,
    pub dma: c_uchar,
    pub port: c_uchar,
}

#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone)]
pub union ifr_ifru {
    pub ifru_addr: sockaddr,
    pub ifru_flags: c_short,
    pub ifru_ivalue: c_int,
    pub ifru_mtu: c_int,
    pub ifru_map: ifmap,
    pub ifru_data: *mut c_void,
}

#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ifreq {
    pub ifr_name: [c_char; IFNAMSIZ],
    pub ifr_ifru: ifr_ifru,
}

impl ifreq {
    /// A request carrying `name` and `flags`; `name` must already be validated.
    pub fn new(name: &str, flags: c_short) -> Self {
        let mut req: ifreq = unsafe { std::mem::zeroed() };
        for (dst, src) in req.ifr_name.iter_mut().zip(name.bytes().take(IFNAMSIZ - 1)) {
            *dst = src as c_char;
        }
        req.ifr_ifru.ifru_flags = flags;
        req
    }

    /// The interface name as written back by the kernel.
    pub fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .ifr_name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn flags(&self) -> c_short {
        unsafe { self.ifr_ifru.ifru_flags }
    }
}

/// Sysfs attribute holding the flags an interface was configured with.
///
/// `TUNGETIFF` cannot be used to recover `IFF_NO_PI`: it ORs in the
/// per-descriptor `IFF_NOFILTER` bit, which has the same value.
pub fn tun_flags_path(name: &str) -> PathBuf {
    Path::new("/sys/class/net").join(name).join("tun_flags")
}

/// Parses the `0x...` form the kernel writes to `tun_flags`.
pub fn parse_tun_flags(text: &str) -> Option<c_short> {
    let hex = text.trim().strip_prefix("0x")?;
    u16::from_str_radix(hex, 16).ok().map(|flags| flags as c_short)
}

ioctl_write_int!(tunsetiff, b'T', 202);
ioctl_read!(tungetiff, b'T', 210, c_uint);
