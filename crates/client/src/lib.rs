// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chatlink: resilient real-time chat client.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ ChatHandle  │────►│ ChatManager │────►│  Transport  │────► server
//! │  (caller)   │◄────│   (task)    │◄────│   (trait)   │◄────
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                        │       │
//!                        ▼       ▼
//!              ┌───────────────┐ ┌─────────┐
//!              │ OutboundQueue │ │ SeenIds │
//!              └───────────────┘ └─────────┘
//! ```
//!
//! # Features
//!
//! - Reconnect with capped exponential backoff
//! - Application heartbeats while connected
//! - At-least-once delivery: queue while offline, retry until acknowledged
//! - Gzip for large frames
//! - Duplicate suppression over a bounded id window
//! - Injectable transport and clock for testing

pub mod cli;
mod error;
mod handle;
mod handler;
mod manager;
mod outbound;
mod seen;
mod transport;

pub use chatlink_core::{
    ChatConfig, ConnectionState, Endpoint, Envelope, Frame, MessageId, MessageKind,
};
pub use error::{ChatError, ChatResult};
pub use handle::ChatHandle;
pub use handler::{ChatEvent, ChatHandler};
pub use manager::{ChatManager, QueueStats, NORMAL_CLOSURE};
pub use outbound::{OutboundMessage, OutboundQueue, SendOptions, Sweep};
pub use seen::SeenIds;
pub use transport::{
    Incoming, Transport, TransportError, TransportFuture, TransportResult, WebSocketTransport,
};

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod cli_tests;





#[cfg(test)]
mod transport_tests;
