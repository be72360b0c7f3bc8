// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol envelope for client-server communication.
//!
//! Every frame, in either direction, carries the same envelope:
//!
//! ```text
//! { "id": "msg_...", "type": "chat_message", "content": { ... }, "timestamp": 1700000000000 }
//! ```
//!
//! `id` is present on frames that expect an acknowledgment. The `type` tag is
//! modelled as the closed [`MessageKind`] union; tags neither side knows about
//! land in [`MessageKind::Other`] so they can be logged and dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::id::MessageId;

/// State of a chat session's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport session and none being opened.
    Disconnected,
    /// A transport session is being opened.
    Connecting,
    /// The transport session is open.
    Connected,
    /// Waiting out a backoff delay before the next connection attempt.
    Reconnecting,
    /// The transport reported an error or the network went away.
    Error,
}

impl ConnectionState {
    /// Returns the wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "disconnected" => Ok(ConnectionState::Disconnected),
            "connecting" => Ok(ConnectionState::Connecting),
            "connected" => Ok(ConnectionState::Connected),
            "reconnecting" => Ok(ConnectionState::Reconnecting),
            "error" => Ok(ConnectionState::Error),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

/// The `type` tag of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    // Client -> Server
    /// A chat message (`{content, message_type}`).
    Message,
    /// Typing indicator (`{typing}`).
    Typing,
    /// Read receipt (`{message_id}`).
    ReadStatus,
    FileUpload,
    ImageMessage,
    VoiceMessage,
    VideoMessage,

    // Either direction
    /// Application-level keepalive.
    Heartbeat,
    /// Reply to a heartbeat.
    HeartbeatAck,

    // Server -> Client
    /// Acknowledges the frame whose id it carries.
    Ack,
    /// Server-announced connection state (`{state}`).
    ConnectionStateUpdate,
    ConnectionEstablished,
    ChatMessage,
    UserJoined,
    UserLeft,
    TypingStatus,
    ReadStatusUpdate,

    /// Any tag not listed above.
    Other(String),
}

impl MessageKind {
    /// Returns the wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Message => "message",
            MessageKind::Typing => "typing",
            MessageKind::ReadStatus => "read_status",
            MessageKind::FileUpload => "file_upload",
            MessageKind::ImageMessage => "image_message",
            MessageKind::VoiceMessage => "voice_message",
            MessageKind::VideoMessage => "video_message",
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::HeartbeatAck => "heartbeat_ack",
            MessageKind::Ack => "ack",
            MessageKind::ConnectionStateUpdate => "connection_state",
            MessageKind::ConnectionEstablished => "connection_established",
            MessageKind::ChatMessage => "chat_message",
            MessageKind::UserJoined => "user_joined",
            MessageKind::UserLeft => "user_left",
            MessageKind::TypingStatus => "typing_status",
            MessageKind::ReadStatusUpdate => "read_status_update",
            MessageKind::Other(tag) => tag,
        }
    }

    /// Returns true for keepalive traffic, which is never queued for retry.
    pub fn is_control(&self) -> bool {
        matches!(self, MessageKind::Heartbeat | MessageKind::HeartbeatAck)
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        match tag {
            "message" => MessageKind::Message,
            "typing" => MessageKind::Typing,
            "read_status" => MessageKind::ReadStatus,
            "file_upload" => MessageKind::FileUpload,
            "image_message" => MessageKind::ImageMessage,
            "voice_message" => MessageKind::VoiceMessage,
            "video_message" => MessageKind::VideoMessage,
            "heartbeat" => MessageKind::Heartbeat,
            "heartbeat_ack" => MessageKind::HeartbeatAck,
            "ack" => MessageKind::Ack,
            "connection_state" => MessageKind::ConnectionStateUpdate,
            "connection_established" => MessageKind::ConnectionEstablished,
            "chat_message" => MessageKind::ChatMessage,
            "user_joined" => MessageKind::UserJoined,
            "user_left" => MessageKind::UserLeft,
            "typing_status" => MessageKind::TypingStatus,
            "read_status_update" => MessageKind::ReadStatusUpdate,
            other => MessageKind::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match MessageKind::from(tag.as_str()) {
            MessageKind::Other(_) => MessageKind::Other(tag),
            known => known,
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single frame's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier; present on frames that expect acknowledgment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Kind-specific payload.
    #[serde(default)]
    pub content: Value,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl Envelope {
    /// Creates an envelope without an id.
    pub fn new(kind: MessageKind, content: Value, timestamp: u64) -> Self {
        Envelope {
            id: None,
            kind,
            content,
            timestamp,
        }
    }

    /// Sets the envelope id.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Creates an acknowledgment for the given id.
    pub fn ack(id: MessageId, timestamp: u64) -> Self {
        Envelope::new(MessageKind::Ack, Value::Null, timestamp).with_id(id)
    }

    /// Serializes the envelope to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an envelope from JSON text.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Deserializes an envelope from UTF-8 JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
