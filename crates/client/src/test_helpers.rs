// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for client tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chatlink_core::{
    ChatConfig, ClockSource, Endpoint, Envelope, ManualClock, MessageId, MessageKind,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::handler::ChatEvent;
use crate::manager::ChatManager;
use crate::transport_tests::{mock_transport, MockRemote, MockTransport};

/// Wall clock that follows tokio time, so paused tests age messages too.
pub struct TokioClock {
    base_ms: u64,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        TokioClock {
            base_ms: 1_700_000_000_000,
            start: tokio::time::Instant::now(),
        }
    }
}

impl ClockSource for TokioClock {
    fn now_ms(&self) -> u64 {
        self.base_ms + self.start.elapsed().as_millis() as u64
    }
}

pub fn test_endpoint() -> Endpoint {
    Endpoint::new("chat.test:8000", false)
}

/// A manager wired to a mock transport, a manual clock and an event channel.
pub struct Harness {
    pub manager: ChatManager<MockTransport, Arc<ManualClock>>,
    pub remote: MockRemote,
    pub clock: Arc<ManualClock>,
    pub events: mpsc::UnboundedReceiver<ChatEvent>,
}

impl Harness {
    pub fn new(config: ChatConfig) -> Self {
        let (transport, remote) = mock_transport();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let (tx, events) = mpsc::unbounded_channel();
        let manager = ChatManager::with_transport(
            "lobby",
            &test_endpoint(),
            config,
            tx,
            transport,
            Arc::clone(&clock),
        )
        .unwrap();
        Harness {
            manager,
            remote,
            clock,
            events,
        }
    }

    /// Events received so far.
    pub fn drain(&mut self) -> Vec<ChatEvent> {
        drain(&mut self.events)
    }

    /// Sent envelopes of the given kind.
    pub fn sent_of(&self, kind: MessageKind) -> Vec<Envelope> {
        sent_of(&self.remote, kind)
    }
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub fn sent_of(remote: &MockRemote, kind: MessageKind) -> Vec<Envelope> {
    remote
        .sent_envelopes()
        .into_iter()
        .filter(|e| e.kind == kind)
        .collect()
}

/// A server frame of `kind` carrying `id`.
pub fn server_frame(kind: MessageKind, id: &str, content: Value) -> Envelope {
    Envelope::new(kind, content, 0).with_id(MessageId::from(id))
}

/// An acknowledgment for `id`.
pub fn ack(id: &MessageId) -> Envelope {
    Envelope::ack(id.clone(), 0)
}
