// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    invalid_room = { Error::InvalidRoom("a/b".into()), "a/b" },
    invalid_state = { Error::InvalidState("sleeping".into()), "sleeping" },
    config = { Error::Config("heartbeat_interval_ms must be positive".into()), "heartbeat_interval_ms" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn invalid_room_display_has_hint() {
    let msg = Error::InvalidRoom(String::new()).to_string();
    assert!(msg.contains("hint:"));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn error_from_codec() {
    let codec_err = crate::codec::decompress(b"not gzip").unwrap_err();
    let err: Error = codec_err.into();
    assert!(matches!(err, Error::Codec(_)));
}
