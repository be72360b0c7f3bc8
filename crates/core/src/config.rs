// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Chat session configuration.
//!
//! Every key is optional; a missing key takes the default below. Durations
//! are whole milliseconds:
//!
//! ```toml
//! heartbeat_interval_ms = 30000
//! reconnect_delay_ms = 1000
//! max_reconnect_delay_ms = 30000
//! max_reconnect_attempts = 10
//! connect_timeout_ms = 10000
//! compression_enabled = true
//! compression_threshold = 1024
//! ack_timeout_ms = 5000
//! retry_interval_ms = 1000
//! max_retries = 3
//! seen_capacity = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::codec::CompressionPolicy;
use crate::error::{Error, Result};

/// Per-instance session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfig {
    /// Interval between outbound heartbeats while connected.
    pub heartbeat_interval_ms: u64,
    /// Base reconnect delay; doubled on each failed attempt.
    pub reconnect_delay_ms: u64,
    /// Ceiling for the reconnect delay.
    pub max_reconnect_delay_ms: u64,
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Limit on opening the transport, and on the closing handshake.
    pub connect_timeout_ms: u64,
    pub compression_enabled: bool,
    /// Serialized envelopes strictly larger than this are gzip'd.
    pub compression_threshold: usize,
    /// Age after which an unacknowledged message is retried.
    pub ack_timeout_ms: u64,
    /// How often the awaiting-ack map is swept.
    pub retry_interval_ms: u64,
    /// Default per-message retry limit.
    pub max_retries: u32,
    /// Number of inbound ids remembered for duplicate suppression.
    pub seen_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            heartbeat_interval_ms: 30_000,
            reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 30_000,
            max_reconnect_attempts: 10,
            connect_timeout_ms: 10_000,
            compression_enabled: true,
            compression_threshold: 1024,
            ack_timeout_ms: 5_000,
            retry_interval_ms: 1_000,
            max_retries: 3,
            seen_capacity: 1024,
        }
    }
}

impl ChatConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ChatConfig = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that the settings can drive a session.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("reconnect_delay_ms", self.reconnect_delay_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("ack_timeout_ms", self.ack_timeout_ms),
            ("retry_interval_ms", self.retry_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(Error::Config(format!("{name} must be greater than zero")));
        }
        if self.max_reconnect_delay_ms < self.reconnect_delay_ms {
            return Err(Error::Config(format!(
                "max_reconnect_delay_ms ({}) is below reconnect_delay_ms ({})",
                self.max_reconnect_delay_ms, self.reconnect_delay_ms
            )));
        }
        if self.seen_capacity == 0 {
            return Err(Error::Config(
                "seen_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Reconnect backoff derived from the delay settings.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_delay_ms),
            Duration::from_millis(self.max_reconnect_delay_ms),
        )
    }

    /// Outbound compression policy.
    pub fn compression(&self) -> CompressionPolicy {
        CompressionPolicy {
            enabled: self.compression_enabled,
            threshold: self.compression_threshold,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
