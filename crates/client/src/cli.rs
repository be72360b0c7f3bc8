// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented front end for the `chatlink` binary.
//!
//! Stdin lines are parsed into [`Input`]s; session events are rendered one
//! line each with a local time stamp.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::handler::ChatEvent;

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain text to send as a chat message.
    Chat(String),
    /// `/typing on|off`
    Typing(bool),
    /// `/read <id>`
    Read(String),
    /// `/state`
    State,
    /// `/quit`
    Quit,
    /// Blank line.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command: /{0}\n  hint: commands are /typing on|off, /read <id>, /state, /quit")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line of user input.
pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Chat(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    let extra = parts.next();

    match (name, arg, extra) {
        ("typing", Some("on"), None) => Ok(Input::Typing(true)),
        ("typing", Some("off"), None) => Ok(Input::Typing(false)),
        ("typing", _, _) => Err(InputError::Usage("/typing on|off")),
        ("read", Some(id), None) => Ok(Input::Read(id.to_string())),
        ("read", _, _) => Err(InputError::Usage("/read <message-id>")),
        ("state", None, None) => Ok(Input::State),
        ("quit" | "exit", None, None) => Ok(Input::Quit),
        ("state", _, _) => Err(InputError::Usage("/state")),
        ("quit" | "exit", _, _) => Err(InputError::Usage("/quit")),
        (other, _, _) => Err(InputError::UnknownCommand(other.to_string())),
    }
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn username(value: &Value) -> &str {
    field(value, "username").unwrap_or("someone")
}

/// Render a session event as one line of output.
pub fn format_event(event: &ChatEvent, at: DateTime<Local>) -> String {
    let stamp = at.format("%H:%M:%S");
    let body = match event {
        ChatEvent::Message(content) => {
            let who = username(content);
            match content.get("content") {
                Some(Value::String(text)) => format!("{who}: {text}"),
                _ => {
                    let kind = field(content, "message_type").unwrap_or("attachment");
                    format!("{who} sent a {kind}")
                }
            }
        }
        ChatEvent::StateChange(state) => format!("* connection {state}"),
        ChatEvent::UserJoined(user) => format!("* {} joined", username(user)),
        ChatEvent::UserLeft(user) => format!("* {} left", username(user)),
        ChatEvent::Typing(data) => {
            let typing = data.get("typing").and_then(Value::as_bool).unwrap_or(false);
            if typing {
                format!("* {} is typing", username(data))
            } else {
                format!("* {} stopped typing", username(data))
            }
        }
        ChatEvent::ReadStatus(data) => format!(
            "* {} read {}",
            username(data),
            field(data, "message_id").unwrap_or("?")
        ),
        ChatEvent::DeliveryFailed { id, kind } => format!("! {kind} {id} was not delivered"),
    };
    format!("[{stamp}] {body}")
}
