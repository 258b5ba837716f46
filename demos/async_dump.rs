//! Async variant of `dump`: prints a one-line summary of each frame.
use std::io;

use tun_handle::{Mode, TunnelBuilder};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    let (tx, mut quit) = tokio::sync::mpsc::channel::<()>(1);

    ctrlc2::set_async_handler(async move {
        tx.send(()).await.expect("Signal error");
    })
    .await;

    let mode = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Mode>()?,
        None => Mode::Tun,
    };
    let dev = TunnelBuilder::new().mode(mode).build_async()?;
    println!("Tunnel '{}' ({}) is open.", dev.name(), dev.mode());
    loop {
        tokio::select! {
            _ = quit.recv() => {
                println!("Quit...");
                break;
            }
            frame = dev.receive_frame() => {
                let frame = frame?;
                let head: Vec<String> = frame.iter().take(16).map(|b| format!("{b:02X}")).collect();
                println!("{:5} bytes  {}", frame.len(), head.join(" "));
            }
        }
    }
    Ok(())
}
