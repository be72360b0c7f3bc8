// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chatlink-relay: WebSocket relay for chatlink rooms.
//!
//! Acknowledges every client frame that carries an id, answers heartbeats
//! and fans chat traffic out to everyone in the same room. Rooms live in
//! memory only; nothing is persisted.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chatlink_core::CompressionPolicy;

/// chatlink-relay: in-memory chat room relay
#[derive(Parser, Debug)]
#[command(name = "chatlink-relay")]
#[command(about = "WebSocket relay for exercising chatlink clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Interval between server heartbeats in seconds (0 disables them)
    #[arg(long, default_value = "30")]
    heartbeat_secs: u64,

    /// Gzip outgoing frames larger than this many bytes
    #[arg(long, default_value = "1024")]
    compress_above: usize,

    /// Never gzip outgoing frames
    #[arg(long)]
    no_compression: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let heartbeat = (args.heartbeat_secs > 0).then(|| Duration::from_secs(args.heartbeat_secs));
    let compression = if args.no_compression {
        CompressionPolicy::disabled()
    } else {
        CompressionPolicy {
            enabled: true,
            threshold: args.compress_above,
        }
    };

    info!("Starting chatlink-relay");
    info!("  Bind address: {}", args.bind);
    match heartbeat {
        Some(interval) => info!("  Heartbeat: every {}s", interval.as_secs()),
        None => info!("  Heartbeat: disabled"),
    }
    info!("  Compression: {:?}", compression);

    let state = state::RelayState::new(state::RelayConfig {
        heartbeat,
        compression,
    });

    server::run(args.bind, state).await?;

    Ok(())
}
