// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message identifiers.
//!
//! Outbound ids are `msg_` followed by the simple (hex) form of a UUIDv7:
//! a millisecond timestamp plus random bits, so a client can mint them
//! without coordinating with the server or other clients.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Prefix of generated ids.
const ID_PREFIX: &str = "msg_";

/// Identifier carried in an envelope's `id` field.
///
/// Inbound frames may use any string; only ids minted by [`MessageId::generate`]
/// follow the `msg_` format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Mints a new, process-unique id.
    pub fn generate() -> Self {
        MessageId(format!("{ID_PREFIX}{}", Uuid::now_v7().simple()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        MessageId(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId(s.to_string())
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
