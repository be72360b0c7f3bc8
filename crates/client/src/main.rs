// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chatlink: command-line chat client.
//!
//! Joins one room, prints incoming events and sends each stdin line as a
//! chat message. See [`chatlink::cli`] for the slash commands.

use std::path::PathBuf;

use chatlink::cli::{format_event, parse_input, Input};
use chatlink::{ChatConfig, ChatEvent, ChatManager, Endpoint};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// chatlink: resilient real-time chat client
#[derive(Parser, Debug)]
#[command(name = "chatlink")]
#[command(about = "Join a chat room and talk from the terminal")]
struct Args {
    /// Server address (host[:port])
    #[arg(long, default_value = "127.0.0.1:7890")]
    host: String,

    /// Room to join
    #[arg(short, long, default_value = "lobby")]
    room: String,

    /// Use wss:// instead of ws://
    #[arg(long)]
    secure: bool,

    /// Session settings (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

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
        Level::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => ChatConfig::load(path)?,
        None => ChatConfig::default(),
    };
    let endpoint = Endpoint::new(args.host, args.secure);

    let (events_tx, mut events) = mpsc::unbounded_channel::<ChatEvent>();
    let manager = ChatManager::new(&args.room, &endpoint, config, events_tx)?;
    println!("joining {}", manager.url());
    let chat = manager.spawn();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(Input::Chat(text)) => {
                        let id = chat.send_chat_message(&text, None)?;
                        debug!(id = %id, "sent");
                    }
                    Ok(Input::Typing(on)) => {
                        chat.send_typing_status(on)?;
                    }
                    Ok(Input::Read(id)) => {
                        chat.send_read_status(&id)?;
                    }
                    Ok(Input::State) => println!(
                        "state: {}, queued: {}, unacknowledged: {}",
                        chat.connection_state(),
                        chat.queue_size(),
                        chat.unacknowledged_count()
                    ),
                    Ok(Input::Quit) => break,
                    Ok(Input::Empty) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            event = events.recv() => match event {
                Some(event) => println!("{}", format_event(&event, chrono::Local::now())),
                None => break,
            },
        }
    }

    chat.disconnect().await?;
    Ok(())
}
