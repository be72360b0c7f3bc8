// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Application callbacks.

use chatlink_core::{ConnectionState, MessageId, MessageKind};
use serde_json::Value;
use tokio::sync::mpsc;

/// Receives routed inbound events and session notifications.
///
/// Every method has an empty default body, so an implementation only
/// overrides what it cares about. Callbacks run on the session task; they
/// should hand work off rather than block.
pub trait ChatHandler: Send {
    /// A `chat_message` arrived.
    fn on_message(&mut self, _content: Value) {}

    /// The session changed state, or the server announced a state.
    fn on_state_change(&mut self, _state: ConnectionState) {}

    fn on_user_joined(&mut self, _user: Value) {}

    fn on_user_left(&mut self, _user: Value) {}

    /// A `typing_status` arrived.
    fn on_typing(&mut self, _data: Value) {}

    /// A `read_status_update` arrived.
    fn on_read_status(&mut self, _data: Value) {}

    /// A message used up its retries without being acknowledged.
    fn on_delivery_failed(&mut self, _id: &MessageId, _kind: &MessageKind) {}
}

impl ChatHandler for () {}

/// A handler callback as a value, for hosts that prefer a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(Value),
    StateChange(ConnectionState),
    UserJoined(Value),
    UserLeft(Value),
    Typing(Value),
    ReadStatus(Value),
    DeliveryFailed { id: MessageId, kind: MessageKind },
}

/// Forwards every callback as a [`ChatEvent`]; a closed receiver drops events.
impl ChatHandler for mpsc::UnboundedSender<ChatEvent> {
    fn on_message(&mut self, content: Value) {
        let _ = self.send(ChatEvent::Message(content));
    }

    fn on_state_change(&mut self, state: ConnectionState) {
        let _ = self.send(ChatEvent::StateChange(state));
    }

    fn on_user_joined(&mut self, user: Value) {
        let _ = self.send(ChatEvent::UserJoined(user));
    }

    fn on_user_left(&mut self, user: Value) {
        let _ = self.send(ChatEvent::UserLeft(user));
    }

    fn on_typing(&mut self, data: Value) {
        let _ = self.send(ChatEvent::Typing(data));
    }

    fn on_read_status(&mut self, data: Value) {
        let _ = self.send(ChatEvent::ReadStatus(data));
    }

    fn on_delivery_failed(&mut self, id: &MessageId, kind: &MessageKind) {
        let _ = self.send(ChatEvent::DeliveryFailed {
            id: id.clone(),
            kind: kind.clone(),
        });
    }
}
