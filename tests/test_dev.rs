//! Tests against the real `/dev/net/tun`.
//!
//! Creating interfaces needs `CAP_NET_ADMIN`; without it (or without the
//! device node) every test here returns early.
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::os::fd::{AsRawFd, IntoRawFd};
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{self, Ipv4Packet, MutableIpv4Packet};
use pnet_packet::udp::{self, MutableUdpPacket, UdpPacket};
use pnet_packet::Packet;
use tun_handle::{Error, Mode, Tunnel, TunnelBuilder, Waitable};

fn init_log() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

fn build_or_skip(builder: TunnelBuilder) -> Option<Tunnel> {
    init_log();
    match builder.build() {
        Ok(tunnel) => Some(tunnel),
        Err(e) if e.is_permission_denied() || e.is_not_found() => {
            eprintln!("skipping, no access to the TUN driver: {e}");
            None
        }
        Err(e) => panic!("unexpected error: {e:?}"),
    }
}

fn random_name(prefix: &str) -> String {
    format!("{prefix}{}", rand::random::<u16>())
}

fn ip(args: &[&str]) -> bool {
    match Command::new("ip").args(args).status() {
        Ok(status) => status.success(),
        Err(e) => {
            eprintln!("cannot run ip: {e}");
            false
        }
    }
}

#[test]
fn test_tun_explicit_name() {
    let name = random_name("tht");
    let Some(tun) = build_or_skip(TunnelBuilder::new().name(&name)) else {
        return;
    };
    assert_eq!(tun.name(), name);
    assert_eq!(tun.mode(), Mode::Tun);
    assert!(!tun.packet_information());
    assert!(!tun.is_closed());
    assert!(tun.if_index().unwrap() > 0);
    assert!(Path::new("/sys/class/net").join(&name).exists());
}

#[test]
fn test_tap_kernel_assigned_name() {
    let Some(tap) = build_or_skip(TunnelBuilder::new().mode(Mode::Tap)) else {
        return;
    };
    assert!(tap.name().starts_with("tap"), "{}", tap.name());
    assert_eq!(tap.mode(), Mode::Tap);
}

#[test]
fn test_open_shorthand() {
    init_log();
    let tun = match Tunnel::open(Mode::Tun, None) {
        Ok(tun) => tun,
        Err(e) if e.is_permission_denied() || e.is_not_found() => return,
        Err(e) => panic!("{e:?}"),
    };
    assert!(tun.name().starts_with("tun"), "{}", tun.name());
}

#[test]
fn test_assigned_names_are_unique() {
    let Some(first) = build_or_skip(TunnelBuilder::new()) else {
        return;
    };
    let Some(second) = build_or_skip(TunnelBuilder::new()) else {
        return;
    };
    assert_ne!(first.name(), second.name());
}

#[test]
fn test_name_template() {
    let Some(tun) = build_or_skip(TunnelBuilder::new().name("thtpl%d")) else {
        return;
    };
    assert!(tun.name().starts_with("thtpl"), "{}", tun.name());
    assert!(!tun.name().contains('%'));
}

#[test]
fn test_name_in_use() {
    let name = random_name("thb");
    let Some(_first) = build_or_skip(TunnelBuilder::new().name(&name)) else {
        return;
    };
    let err = TunnelBuilder::new().name(&name).build().unwrap_err();
    match err {
        Error::Configuration { name: requested, .. } => assert_eq!(requested, name),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_name_too_long() {
    init_log();
    let err = TunnelBuilder::new()
        .name("a-name-that-is-too-long")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }), "{err:?}");
}

#[test]
fn test_close_is_idempotent() {
    let Some(mut tun) = build_or_skip(TunnelBuilder::new()) else {
        return;
    };
    tun.close().unwrap();
    tun.close().unwrap();
    assert!(tun.is_closed());
    assert_eq!(tun.as_raw_fd(), -1);
    assert!(tun.send(&[0x45; 20]).unwrap_err().is_closed());
    assert!(tun.receive_frame().unwrap_err().is_closed());
    assert!(tun.waitable_fd().unwrap_err().is_closed());
}

#[test]
fn test_close_removes_interface() {
    let name = random_name("thc");
    let Some(mut tun) = build_or_skip(TunnelBuilder::new().name(&name)) else {
        return;
    };
    let path = Path::new("/sys/class/net").join(&name);
    assert!(path.exists());
    tun.close().unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while path.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(!path.exists());
}

#[test]
fn test_from_fd_recovers_identity() {
    let Some(tap) = build_or_skip(
        TunnelBuilder::new()
            .mode(Mode::Tap)
            .packet_information(true),
    ) else {
        return;
    };
    let name = tap.name().to_string();
    let fd = tap.into_raw_fd();
    let adopted = unsafe { Tunnel::from_fd(fd) }.unwrap();
    assert_eq!(adopted.name(), name);
    assert_eq!(adopted.mode(), Mode::Tap);
    assert!(adopted.packet_information());
    assert_eq!(adopted.as_raw_fd(), fd);
}

#[test]
fn test_from_fd_keeps_packet_information_setting() {
    for (mode, packet_information) in [
        (Mode::Tun, false),
        (Mode::Tun, true),
        (Mode::Tap, false),
        (Mode::Tap, true),
    ] {
        let Some(dev) = build_or_skip(
            TunnelBuilder::new()
                .mode(mode)
                .packet_information(packet_information),
        ) else {
            return;
        };
        assert_eq!(dev.packet_information(), packet_information);
        let adopted = unsafe { Tunnel::from_fd(dev.into_raw_fd()) }.unwrap();
        assert_eq!(adopted.mode(), mode);
        assert_eq!(
            adopted.packet_information(),
            packet_information,
            "{mode} with packet_information({packet_information})"
        );
    }
}

#[test]
fn test_from_fd_rejects_other_descriptors() {
    init_log();
    let file = std::fs::File::open("/dev/null").unwrap();
    let err = unsafe { Tunnel::from_fd(file.into_raw_fd()) }.unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }), "{err:?}");
}

#[test]
fn test_nonblocking_idle_tunnel() {
    let Some(tun) = build_or_skip(TunnelBuilder::new()) else {
        return;
    };
    tun.set_nonblocking(true).unwrap();
    assert!(tun.is_nonblocking().unwrap());
    let mut fds = [PollFd::new(tun.waitable_fd().unwrap(), PollFlags::POLLIN)];
    assert_eq!(poll(&mut fds, PollTimeout::ZERO).unwrap(), 0);
    let err = tun.receive_frame().unwrap_err();
    assert!(err.is_would_block(), "{err:?}");
}

fn build_udp_v4(src: (Ipv4Addr, u16), dst: (Ipv4Addr, u16), payload: &[u8]) -> Vec<u8> {
    let udp_len = 8 + payload.len();
    let total = 20 + udp_len;
    let mut buf = vec![0u8; total];
    {
        let mut udp = MutableUdpPacket::new(&mut buf[20..]).unwrap();
        udp.set_source(src.1);
        udp.set_destination(dst.1);
        udp.set_length(udp_len as u16);
        udp.set_payload(payload);
        let checksum = udp::ipv4_checksum(&udp.to_immutable(), &src.0, &dst.0);
        udp.set_checksum(checksum);
    }
    let mut ip = MutableIpv4Packet::new(&mut buf).unwrap();
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length(total as u16);
    ip.set_ttl(64);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
    ip.set_source(src.0);
    ip.set_destination(dst.0);
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);
    buf
}

#[test]
fn test_udp_v4_round_trip() {
    let name = random_name("thu");
    let Some(tun) = build_or_skip(TunnelBuilder::new().name(&name)) else {
        return;
    };
    let local = Ipv4Addr::new(10, 26, 3, 1);
    let remote = Ipv4Addr::new(10, 26, 3, 2);
    if !ip(&["addr", "add", "10.26.3.1/24", "dev", &name]) || !ip(&["link", "set", &name, "up"]) {
        eprintln!("skipping, cannot configure {name}");
        return;
    }
    tun.set_nonblocking(true).unwrap();

    let socket = UdpSocket::bind((local, 0)).unwrap();
    let local_port = socket.local_addr().unwrap().port();
    socket.send_to(b"test udp", (remote, 8080)).unwrap();

    // outbound: the datagram shows up as one IPv4 packet on the tunnel
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut seen = false;
    while !seen && Instant::now() < deadline {
        let mut fds = [PollFd::new(tun.waitable_fd().unwrap(), PollFlags::POLLIN)];
        if poll(&mut fds, PollTimeout::from(100u16)).unwrap() == 0 {
            continue;
        }
        let frame = match tun.receive_frame() {
            Ok(frame) => frame,
            Err(e) if e.is_would_block() => continue,
            Err(e) => panic!("{e:?}"),
        };
        let Some(packet) = Ipv4Packet::new(&frame) else {
            continue;
        };
        if packet.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
            continue;
        }
        let Some(datagram) = UdpPacket::new(packet.payload()) else {
            continue;
        };
        if datagram.payload() == b"test udp" {
            assert_eq!(packet.get_source(), local);
            assert_eq!(packet.get_destination(), remote);
            assert_eq!(datagram.get_destination(), 8080);
            seen = true;
        }
    }
    assert!(seen, "timeout waiting for the outbound datagram");

    // inbound: a packet written to the tunnel is delivered to the socket
    let reply = build_udp_v4((remote, 8080), (local, local_port), b"reply");
    assert_eq!(tun.send(&reply).unwrap(), reply.len());
    socket
        .set_read_timeout(Some(Duration::from_secs(3)))
        .unwrap();
    let mut buf = [0u8; 64];
    let (n, from) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"reply");
    assert_eq!(from, SocketAddr::from((remote, 8080)));
}
