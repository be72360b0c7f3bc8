// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for chat session operations.

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The session task has stopped; the handle can no longer reach it.
    #[error("chat session has ended")]
    SessionClosed,

    #[error(transparent)]
    Core(#[from] chatlink_core::Error),
}

/// Result type for chat session operations.
pub type ChatResult<T> = Result<T, ChatError>;
