// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound message pipeline state.
//!
//! Messages wait in `pending` until the transport is open, then move to
//! `awaiting` until a frame carrying their id comes back. Expired entries in
//! `awaiting` go back to `pending` until their retry limit is spent.

use std::collections::{HashMap, VecDeque};

use chatlink_core::{Envelope, MessageId, MessageKind};
use serde_json::Value;

/// Per-send options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Overrides the configured retry limit.
    pub max_retries: Option<u32>,
}

impl SendOptions {
    pub fn max_retries(max_retries: u32) -> Self {
        SendOptions {
            max_retries: Some(max_retries),
        }
    }
}

/// A message the client has accepted for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub content: Value,
    /// Epoch ms of creation or of the last retry.
    pub timestamp: u64,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Send order; requeued messages keep their place.
    seq: u64,
}

impl OutboundMessage {
    /// The wire envelope for this message.
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.kind.clone(), self.content.clone(), self.timestamp)
            .with_id(self.id.clone())
    }

    /// Returns true once the message has been unacknowledged for longer than `timeout_ms`.
    pub fn is_expired(&self, now_ms: u64, timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) > timeout_ms
    }
}

/// Result of a retry sweep.
#[derive(Debug, Default)]
pub struct Sweep {
    /// Ids moved back to the pending queue.
    pub requeued: Vec<MessageId>,
    /// Messages that hit their retry limit and were evicted.
    pub exhausted: Vec<OutboundMessage>,
}

/// Pending queue plus awaiting-acknowledgment map.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<OutboundMessage>,
    awaiting: HashMap<MessageId, OutboundMessage>,
    next_seq: u64,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new message to the pending queue.
    pub fn push(
        &mut self,
        id: MessageId,
        kind: MessageKind,
        content: Value,
        timestamp: u64,
        max_retries: u32,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push_back(OutboundMessage {
            id,
            kind,
            content,
            timestamp,
            retry_count: 0,
            max_retries,
            seq,
        });
    }

    /// Takes the next message to transmit.
    pub fn pop_pending(&mut self) -> Option<OutboundMessage> {
        self.pending.pop_front()
    }

    /// Returns a message that could not be transmitted to the head of the queue.
    pub fn unpop(&mut self, message: OutboundMessage) {
        self.pending.push_front(message);
    }

    /// Records a transmitted message as awaiting acknowledgment.
    pub fn mark_sent(&mut self, message: OutboundMessage) {
        self.awaiting.insert(message.id.clone(), message);
    }

    /// Removes the awaiting entry for `id`, if any.
    pub fn acknowledge(&mut self, id: &str) -> Option<OutboundMessage> {
        self.awaiting.remove(id)
    }

    /// Requeues or evicts every awaiting message older than `timeout_ms`.
    pub fn sweep(&mut self, now_ms: u64, timeout_ms: u64) -> Sweep {
        let mut expired: Vec<MessageId> = self
            .awaiting
            .values()
            .filter(|m| m.is_expired(now_ms, timeout_ms))
            .map(|m| m.id.clone())
            .collect();
        expired.sort_by_key(|id| self.awaiting.get(id).map_or(0, |m| m.seq));

        let mut sweep = Sweep::default();
        for id in expired {
            let Some(mut message) = self.awaiting.remove(&id) else {
                continue;
            };
            if message.retry_count < message.max_retries {
                message.retry_count += 1;
                message.timestamp = now_ms;
                sweep.requeued.push(id);
                self.requeue(message);
            } else {
                sweep.exhausted.push(message);
            }
        }
        sweep
    }

    fn requeue(&mut self, message: OutboundMessage) {
        let at = self.pending.partition_point(|m| m.seq < message.seq);
        self.pending.insert(at, message);
    }

    /// Number of messages waiting to be transmitted.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of transmitted messages without an acknowledgment.
    pub fn awaiting_len(&self) -> usize {
        self.awaiting.len()
    }

    /// Ids in the pending queue, in transmission order.
    pub fn pending_ids(&self) -> impl Iterator<Item = &MessageId> {
        self.pending.iter().map(|m| &m.id)
    }

    pub fn is_awaiting(&self, id: &str) -> bool {
        self.awaiting.contains_key(id)
    }
}
