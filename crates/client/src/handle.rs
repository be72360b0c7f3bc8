// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-side handle to a running chat session.

use std::sync::Arc;

use chatlink_core::{ConnectionState, MessageId, MessageKind};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{ChatError, ChatResult};
use crate::manager::QueueStats;
use crate::outbound::SendOptions;

/// Requests from handles to the session task.
#[derive(Debug)]
pub(crate) enum Command {
    Send {
        id: MessageId,
        kind: MessageKind,
        content: Value,
        options: SendOptions,
    },
    NetworkChanged(bool),
    VisibilityChanged(bool),
    Disconnect(oneshot::Sender<()>),
}

/// Cloneable handle to a session started with
/// [`ChatManager::spawn`](crate::ChatManager::spawn).
///
/// Sends return as soon as the message is handed to the session; delivery is
/// tracked by the session itself. Dropping the last handle ends the session.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    stats: Arc<watch::Sender<QueueStats>>,
}

impl ChatHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        state: watch::Receiver<ConnectionState>,
        stats: Arc<watch::Sender<QueueStats>>,
    ) -> Self {
        ChatHandle {
            commands,
            state,
            stats,
        }
    }

    fn command(&self, command: Command) -> ChatResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ChatError::SessionClosed)
    }

    /// Send a message of any kind with default options.
    pub fn send(&self, kind: impl Into<MessageKind>, content: Value) -> ChatResult<MessageId> {
        self.send_with(kind, content, SendOptions::default())
    }

    /// Send a message of any kind.
    pub fn send_with(
        &self,
        kind: impl Into<MessageKind>,
        content: Value,
        options: SendOptions,
    ) -> ChatResult<MessageId> {
        let id = MessageId::generate();
        let kind = kind.into();
        let counted = !kind.is_control();
        if counted {
            self.stats.send_modify(|stats| stats.submitted += 1);
        }
        let sent = self.command(Command::Send {
            id: id.clone(),
            kind,
            content,
            options,
        });
        if sent.is_err() && counted {
            self.stats
                .send_modify(|stats| stats.submitted = stats.submitted.saturating_sub(1));
        }
        sent.map(|()| id)
    }

    /// Send a chat message; `message_type` defaults to `text`.
    pub fn send_chat_message(
        &self,
        content: &str,
        message_type: Option<&str>,
    ) -> ChatResult<MessageId> {
        self.send(
            MessageKind::Message,
            json!({
                "content": content,
                "message_type": message_type.unwrap_or("text"),
            }),
        )
    }

    pub fn send_typing_status(&self, is_typing: bool) -> ChatResult<MessageId> {
        self.send(MessageKind::Typing, json!({ "typing": is_typing }))
    }

    pub fn send_read_status(&self, message_id: &str) -> ChatResult<MessageId> {
        self.send(MessageKind::ReadStatus, json!({ "message_id": message_id }))
    }

    pub fn send_file_upload(&self, file_data: Value) -> ChatResult<MessageId> {
        self.send(MessageKind::FileUpload, json!({ "file_data": file_data }))
    }

    pub fn send_image_message(&self, image_data: Value) -> ChatResult<MessageId> {
        self.send(MessageKind::ImageMessage, json!({ "image_data": image_data }))
    }

    pub fn send_voice_message(&self, voice_data: Value) -> ChatResult<MessageId> {
        self.send(MessageKind::VoiceMessage, json!({ "voice_data": voice_data }))
    }

    pub fn send_video_message(&self, video_data: Value) -> ChatResult<MessageId> {
        self.send(MessageKind::VideoMessage, json!({ "video_data": video_data }))
    }

    /// Last state published by the session.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Messages waiting to be transmitted.
    ///
    /// Counts sends made through any handle that the session has not taken
    /// in yet, so it never lags this handle's own sends.
    pub fn queue_size(&self) -> usize {
        let stats = self.stats.borrow();
        stats.pending + stats.submitted
    }

    /// Transmitted messages without an acknowledgment, as last published
    /// by the session.
    pub fn unacknowledged_count(&self) -> usize {
        self.stats.borrow().unacknowledged
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn watch_stats(&self) -> watch::Receiver<QueueStats> {
        self.stats.subscribe()
    }

    /// Report a connectivity change; coming online reconnects immediately.
    pub fn network_changed(&self, online: bool) -> ChatResult<()> {
        self.command(Command::NetworkChanged(online))
    }

    /// Report a visibility change; becoming visible reconnects immediately.
    pub fn visibility_changed(&self, visible: bool) -> ChatResult<()> {
        self.command(Command::VisibilityChanged(visible))
    }

    /// Close the session with a normal closure and stop the session task.
    ///
    /// Returns once the close has been sent. A session that already ended
    /// is not an error.
    pub async fn disconnect(&self) -> ChatResult<()> {
        let (done, wait) = oneshot::channel();
        if self.command(Command::Disconnect(done)).is_err() {
            return Ok(());
        }
        let _ = wait.await;
        Ok(())
    }

    /// Returns true once the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
