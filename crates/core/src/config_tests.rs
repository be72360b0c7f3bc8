// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::io::Write;
use yare::parameterized;

#[test]
fn defaults() {
    let config = ChatConfig::default();
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
    assert_eq!(config.backoff().base(), Duration::from_secs(1));
    assert_eq!(config.backoff().max(), Duration::from_secs(30));
    assert_eq!(config.max_reconnect_attempts, 10);
    assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    assert!(config.compression_enabled);
    assert_eq!(config.compression_threshold, 1024);
    assert_eq!(config.ack_timeout(), Duration::from_secs(5));
    assert_eq!(config.retry_interval(), Duration::from_secs(1));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.seen_capacity, 1024);
    config.validate().unwrap();
}

#[test]
fn empty_document_is_default() {
    assert_eq!(ChatConfig::from_toml_str("").unwrap(), ChatConfig::default());
}

#[test]
fn partial_document_overrides() {
    let config = ChatConfig::from_toml_str(
        "heartbeat_interval_ms = 500\ncompression_enabled = false\nmax_retries = 7\n",
    )
    .unwrap();
    assert_eq!(config.heartbeat_interval(), Duration::from_millis(500));
    assert!(!config.compression().enabled);
    assert_eq!(config.max_retries, 7);
    assert_eq!(config.ack_timeout_ms, 5_000);
}

#[test]
fn unknown_key_rejected() {
    let err = ChatConfig::from_toml_str("heartbeat_interval = 5\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[parameterized(
    heartbeat = { "heartbeat_interval_ms = 0" },
    reconnect = { "reconnect_delay_ms = 0" },
    connect_timeout = { "connect_timeout_ms = 0" },
    ack = { "ack_timeout_ms = 0" },
    sweep = { "retry_interval_ms = 0" },
    seen = { "seen_capacity = 0" },
    max_below_base = { "reconnect_delay_ms = 5000\nmax_reconnect_delay_ms = 1000" },
)]
fn invalid_values_rejected(toml: &str) {
    let err = ChatConfig::from_toml_str(toml).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_reconnect_attempts = 2").unwrap();
    writeln!(file, "compression_threshold = 64").unwrap();

    let config = ChatConfig::load(file.path()).unwrap();
    assert_eq!(config.max_reconnect_attempts, 2);
    assert_eq!(config.compression().threshold, 64);
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ChatConfig::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
