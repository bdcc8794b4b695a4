//! Record a shared stream to disk
//!
//! Run with: cargo run --example record -- <SOURCE> [HOST] [PORT] [OUT_DIR]
//!
//! Examples:
//!   cargo run --example record -- rtsp://admin:pw@192.168.1.10/stream1
//!   cargo run --example record -- cam1 10.0.0.5 1984 /tmp/rec
//!
//! Two players are mounted on the same source to show that the relay
//! backend sees one add-stream request and one socket. Each player writes
//! its own file. Ctrl+C unmounts both, which removes the backend stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mse_share::config::DEFAULT_PORT;
use mse_share::consumer::FileSinkFactory;
use mse_share::{Player, ShareConfig, ShareContext};

fn print_usage() {
    eprintln!("Usage: record <SOURCE> [HOST] [PORT] [OUT_DIR]");
    eprintln!();
    eprintln!("  SOURCE   upstream source id (e.g. an rtsp:// url)");
    eprintln!("  HOST     relay backend host (default 127.0.0.1)");
    eprintln!("  PORT     relay backend port (default {DEFAULT_PORT})");
    eprintln!("  OUT_DIR  directory for recordings (default .)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let source = args[1].clone();
    let host = args.get(2).map(String::as_str).unwrap_or("127.0.0.1");
    let port = match args.get(3) {
        Some(raw) => raw.parse::<u16>()?,
        None => DEFAULT_PORT,
    };
    let out_dir = args.get(4).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mse_share=debug".parse()?)
                .add_directive("record=debug".parse()?),
        )
        .init();

    let config = ShareConfig::for_host(host, port)?;
    let ctx = Arc::new(ShareContext::new(config));

    let first = Player::mount(&ctx, &source, Arc::new(FileSinkFactory::new(&out_dir, "first")))?;
    let second = Player::mount(&ctx, &source, Arc::new(FileSinkFactory::new(&out_dir, "second")))?;

    println!("Source:  {}", source);
    println!("Stream:  {}", first.stream_name());
    println!("Socket:  {}", first.stream_url()?);
    println!("Output:  {}", out_dir.display());
    println!();

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for (label, player) in [("first", &first), ("second", &second)] {
                    let stats = player.stats();
                    println!(
                        "[{label}] mime={} state={:?} received={} appended={} dropped={} queued={}",
                        player.mime().unwrap_or_else(|| "-".into()),
                        player.buffer_state(),
                        stats.frames_received,
                        stats.frames_appended,
                        stats.frames_dropped,
                        stats.queue_len,
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    first.unmount();
    second.unmount();

    // Let the remove-stream request go out
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(())
}
