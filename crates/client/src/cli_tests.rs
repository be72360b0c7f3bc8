// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use chatlink_core::{ConnectionState, MessageId, MessageKind};
use chrono::{Local, TimeZone};
use serde_json::json;
use yare::parameterized;

use crate::cli::{format_event, parse_input, Input, InputError};
use crate::handler::ChatEvent;

#[parameterized(
    chat = { "hello there", Input::Chat("hello there".into()) },
    chat_trimmed = { "  hi  ", Input::Chat("hi".into()) },
    empty = { "   ", Input::Empty },
    typing_on = { "/typing on", Input::Typing(true) },
    typing_off = { "/typing off", Input::Typing(false) },
    read = { "/read msg_01", Input::Read("msg_01".into()) },
    state = { "/state", Input::State },
    quit = { "/quit", Input::Quit },
    exit = { "/exit", Input::Quit },
)]
fn parse_valid(line: &str, expected: Input) {
    assert_eq!(parse_input(line).unwrap(), expected);
}

#[parameterized(
    typing_missing = { "/typing" },
    typing_bad = { "/typing maybe" },
    read_missing = { "/read" },
    read_extra = { "/read a b" },
    state_extra = { "/state now" },
)]
fn parse_usage_errors(line: &str) {
    assert!(matches!(parse_input(line), Err(InputError::Usage(_))));
}

#[test]
fn parse_unknown_command() {
    assert_eq!(
        parse_input("/dance").unwrap_err(),
        InputError::UnknownCommand("dance".into())
    );
}

fn noon() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2026, 1, 2, 12, 30, 5).unwrap()
}

#[parameterized(
    text = {
        ChatEvent::Message(json!({"username": "ana", "content": "hi", "message_type": "text"})),
        "[12:30:05] ana: hi"
    },
    attachment = {
        ChatEvent::Message(json!({"username": "ana", "content": {"url": "x"}, "message_type": "image"})),
        "[12:30:05] ana sent a image"
    },
    state = {
        ChatEvent::StateChange(ConnectionState::Reconnecting),
        "[12:30:05] * connection reconnecting"
    },
    joined = {
        ChatEvent::UserJoined(json!({"username": "bo"})),
        "[12:30:05] * bo joined"
    },
    left = {
        ChatEvent::UserLeft(json!({})),
        "[12:30:05] * someone left"
    },
    typing = {
        ChatEvent::Typing(json!({"username": "bo", "typing": true})),
        "[12:30:05] * bo is typing"
    },
    stopped_typing = {
        ChatEvent::Typing(json!({"username": "bo", "typing": false})),
        "[12:30:05] * bo stopped typing"
    },
    read = {
        ChatEvent::ReadStatus(json!({"username": "bo", "message_id": "msg_7"})),
        "[12:30:05] * bo read msg_7"
    },
    failed = {
        ChatEvent::DeliveryFailed { id: MessageId::from("msg_9"), kind: MessageKind::Message },
        "[12:30:05] ! message msg_9 was not delivered"
    },
)]
fn format(event: ChatEvent, expected: &str) {
    assert_eq!(format_event(&event, noon()), expected);
}
