// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chatlink-core: Shared library for the chatlink client and relay
//!
//! This crate provides the wire envelope, frame codec, configuration, and
//! small primitives used by both the chatlink client and the development relay.

pub mod backoff;
pub mod clock;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod id;
pub mod protocol;

pub use backoff::Backoff;
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use codec::{CodecError, CompressionPolicy, Frame};
pub use config::ChatConfig;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use id::MessageId;
pub use protocol::{ConnectionState, Envelope, MessageKind};
