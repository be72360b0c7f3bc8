// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Room-scoped transport endpoints.
//!
//! A room lives at `{ws|wss}://{host}/ws/chat/{room}/`.

use crate::error::{Error, Result};

/// Path prefix of chat rooms.
pub const ROOM_PATH_PREFIX: &str = "/ws/chat/";

/// Server address plus scheme choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    secure: bool,
}

impl Endpoint {
    /// Creates an endpoint for `host` (`name[:port]`).
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Endpoint {
            host: host.into(),
            secure,
        }
    }

    /// The host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `wss` when secure, `ws` otherwise.
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Builds the URL of a room.
    pub fn room_url(&self, room: &str) -> Result<String> {
        validate_room(room)?;
        Ok(format!(
            "{}://{}{ROOM_PATH_PREFIX}{room}/",
            self.scheme(),
            self.host
        ))
    }
}

/// Checks that a room id can be embedded in a path segment.
pub fn validate_room(room: &str) -> Result<()> {
    if room.is_empty() || room.contains(['/', '?', '#']) || room.chars().any(char::is_whitespace)
    {
        return Err(Error::InvalidRoom(room.to_string()));
    }
    Ok(())
}

/// Extracts the room id from a request path, if it is a room path.
pub fn room_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(ROOM_PATH_PREFIX)?;
    let room = rest.strip_suffix('/').unwrap_or(rest);
    validate_room(room).ok()?;
    Some(room)
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
