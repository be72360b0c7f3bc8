// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for chatlink-core operations.

use thiserror::Error;

use crate::codec::CodecError;

/// All possible errors that can occur in chatlink-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid room id: '{0}'\n  hint: room ids must be non-empty and may not contain '/', '?' or '#'")]
    InvalidRoom(String),

    #[error("unknown connection state: '{0}'\n  hint: valid states are: disconnected, connecting, connected, reconnecting, error")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for chatlink-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
