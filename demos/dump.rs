//! Opens a tunnel and hex-dumps every frame the kernel hands to it.
//!
//! ```text
//! sudo cargo run --example dump -- tap
//! ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tun_handle::{Mode, TunnelBuilder, Waitable};

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    let quit = Arc::new(AtomicBool::new(false));
    let quit_c = quit.clone();

    let handle = ctrlc2::set_handler(move || {
        quit_c.store(true, Ordering::Relaxed);
        true
    })
    .expect("Error setting Ctrl-C handler");

    main_entry(&quit)?;
    handle.join().unwrap();
    Ok(())
}

fn main_entry(quit: &AtomicBool) -> std::io::Result<()> {
    let mode = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Mode>()?,
        None => Mode::Tun,
    };
    let dev = match TunnelBuilder::new().mode(mode).build() {
        Ok(dev) => dev,
        Err(e) if e.is_permission_denied() => {
            println!("{}", "*".repeat(80));
            println!(
                "You do not have the privileges to configure a tunnel.\n\
                 Run as root or grant CAP_NET_ADMIN to this binary."
            );
            println!("{}", "*".repeat(80));
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}", "*".repeat(80));
    println!("Tunnel '{}' ({}) is open. Press Ctrl-C to quit.", dev.name(), dev.mode());
    println!("{}", "*".repeat(80));
    dev.set_nonblocking(true)?;

    while !quit.load(Ordering::Relaxed) {
        let mut fds = [PollFd::new(dev.waitable_fd()?, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(500u16)) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
        match dev.receive_frame() {
            Ok(frame) => {
                println!("{} bytes:", frame.len());
                print_hex(&frame);
            }
            Err(e) if e.is_would_block() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    println!("Quit...");
    Ok(())
}

fn print_hex(buf: &[u8]) {
    print!("    ");
    for i in 0..16 {
        print!(" {i:02X}");
    }
    println!();
    for (row, chunk) in buf.chunks(16).enumerate() {
        print!("{:04X}", row * 16);
        for b in chunk {
            print!(" {b:02X}");
        }
        let text: String = chunk
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();
        println!("{}\t{text}", "   ".repeat(16 - chunk.len()));
    }
}
