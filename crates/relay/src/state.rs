// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Relay state: rooms and their members.
//!
//! Each room is a broadcast channel; a member holds a sender to its room and
//! a receiver of its own. A room is dropped when its last member leaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatlink_core::{CompressionPolicy, Envelope};
use tokio::sync::{broadcast, Mutex};

/// Buffered events per room before slow members start lagging.
const ROOM_CAPACITY: usize = 1024;

/// Relay-wide settings.
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// Interval between heartbeats sent to each client, if any.
    pub heartbeat: Option<Duration>,
    /// Compression for outgoing frames.
    pub compression: CompressionPolicy,
}

/// An envelope fanned out to a room.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// Member that should not receive the event.
    pub skip: Option<u64>,
    pub envelope: Envelope,
}

/// Shared relay state.
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<RelayStateInner>,
}

struct RelayStateInner {
    config: RelayConfig,
    rooms: Mutex<HashMap<String, broadcast::Sender<RoomEvent>>>,
    next_member: AtomicU64,
}

/// One connected client.
pub struct Member {
    pub id: u64,
    pub username: String,
    pub room: String,
    tx: broadcast::Sender<RoomEvent>,
}

impl Member {
    /// Send to every member of the room, including this one.
    pub fn broadcast(&self, envelope: Envelope) {
        let _ = self.tx.send(RoomEvent {
            skip: None,
            envelope,
        });
    }

    /// Send to every other member of the room.
    pub fn broadcast_others(&self, envelope: Envelope) {
        let _ = self.tx.send(RoomEvent {
            skip: Some(self.id),
            envelope,
        });
    }

    /// Returns true if `event` is meant for this member.
    pub fn wants(&self, event: &RoomEvent) -> bool {
        event.skip != Some(self.id)
    }
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        RelayState {
            inner: Arc::new(RelayStateInner {
                config,
                rooms: Mutex::new(HashMap::new()),
                next_member: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> RelayConfig {
        self.inner.config
    }

    /// Adds a member to `room`, creating the room if needed.
    pub async fn join(&self, room: &str) -> (Member, broadcast::Receiver<RoomEvent>) {
        let id = self.inner.next_member.fetch_add(1, Ordering::Relaxed);
        let mut rooms = self.inner.rooms.lock().await;
        let tx = rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .clone();
        let rx = tx.subscribe();
        let member = Member {
            id,
            username: format!("guest-{id}"),
            room: room.to_string(),
            tx,
        };
        (member, rx)
    }

    /// Removes a member, dropping the room once it is empty.
    pub async fn leave(&self, member: &Member, rx: broadcast::Receiver<RoomEvent>) {
        drop(rx);
        let mut rooms = self.inner.rooms.lock().await;
        let empty = rooms
            .get(&member.room)
            .is_some_and(|tx| tx.receiver_count() == 0);
        if empty {
            rooms.remove(&member.room);
        }
    }

    /// Number of rooms with at least one member.
    #[cfg(test)]
    pub async fn room_count(&self) -> usize {
        self.inner.rooms.lock().await.len()
    }
}
