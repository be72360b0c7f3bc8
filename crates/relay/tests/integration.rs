// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the chatlink-relay binary, driven by real clients.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use chatlink::{ChatConfig, ChatEvent, ChatHandle, ChatManager, ConnectionState, Endpoint};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Helper to spawn a relay process and clean it up on drop.
struct RelayProcess {
    child: Child,
    port: u16,
}

impl RelayProcess {
    fn spawn() -> Self {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        Self::spawn_on(port)
    }

    fn spawn_on(port: u16) -> Self {
        let child = Command::new(env!("CARGO_BIN_EXE_chatlink-relay"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--heartbeat-secs")
            .arg("0")
            .arg("--compress-above")
            .arg("256")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn relay process");

        RelayProcess { child, port }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(format!("127.0.0.1:{}", self.port), false)
    }

    /// Wait until the relay accepts TCP connections.
    async fn ready(&self) {
        // CI runners can be slow, so we use generous retries
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("relay did not start on port {}", self.port);
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for RelayProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

fn fast_config() -> ChatConfig {
    ChatConfig {
        reconnect_delay_ms: 100,
        max_reconnect_delay_ms: 400,
        max_reconnect_attempts: 50,
        ..ChatConfig::default()
    }
}

fn join(
    relay: &RelayProcess,
    config: ChatConfig,
) -> (ChatHandle, mpsc::UnboundedReceiver<ChatEvent>) {
    let (tx, events) = mpsc::unbounded_channel();
    let manager = ChatManager::new("lobby", &relay.endpoint(), config, tx).unwrap();
    (manager.spawn(), events)
}

async fn wait_for_state(chat: &ChatHandle, state: ConnectionState) {
    timeout(
        Duration::from_secs(10),
        chat.watch_state().wait_for(|s| *s == state),
    )
    .await
    .unwrap_or_else(|_| panic!("never reached {}", state))
    .unwrap();
}

async fn wait_for_delivery(chat: &ChatHandle) {
    timeout(
        Duration::from_secs(10),
        chat.watch_stats()
            .wait_for(|s| s.submitted == 0 && s.pending == 0 && s.unacknowledged == 0),
    )
    .await
    .expect("messages never acknowledged")
    .unwrap();
}

/// Receives events until `pred` matches.
async fn wait_for_event(
    events: &mut mpsc::UnboundedReceiver<ChatEvent>,
    pred: impl Fn(&ChatEvent) -> bool,
) -> ChatEvent {
    timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.expect("session ended");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event never arrived")
}

#[tokio::test]
async fn test_message_delivered_between_clients() {
    let relay = RelayProcess::spawn();
    relay.ready().await;

    let (alice, mut alice_events) = join(&relay, ChatConfig::default());
    wait_for_state(&alice, ConnectionState::Connected).await;
    let (bob, mut bob_events) = join(&relay, ChatConfig::default());
    wait_for_state(&bob, ConnectionState::Connected).await;

    wait_for_event(&mut alice_events, |e| matches!(e, ChatEvent::UserJoined(_))).await;

    let id = alice.send_chat_message("hello bob", None).unwrap();
    wait_for_delivery(&alice).await;

    let event = wait_for_event(&mut bob_events, |e| matches!(e, ChatEvent::Message(_))).await;
    let ChatEvent::Message(content) = event else {
        unreachable!()
    };
    assert_eq!(content["content"], "hello bob");
    assert_eq!(content["message_type"], "text");
    assert_eq!(content["message_id"], id.as_str());

    bob.send_typing_status(true).unwrap();
    bob.send_read_status(id.as_str()).unwrap();
    wait_for_delivery(&bob).await;
    wait_for_event(&mut alice_events, |e| {
        matches!(e, ChatEvent::Typing(c) if c["typing"] == json!(true))
    })
    .await;
    wait_for_event(&mut alice_events, |e| {
        matches!(e, ChatEvent::ReadStatus(c) if c["message_id"] == json!(id.as_str()))
    })
    .await;

    alice.disconnect().await.unwrap();
    bob.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_large_messages_round_trip_compressed() {
    let relay = RelayProcess::spawn();
    relay.ready().await;

    let (alice, _alice_events) = join(&relay, ChatConfig::default());
    let (bob, mut bob_events) = join(&relay, ChatConfig::default());
    wait_for_state(&alice, ConnectionState::Connected).await;
    wait_for_state(&bob, ConnectionState::Connected).await;

    let big = "z".repeat(8192);
    alice.send_chat_message(&big, None).unwrap();
    wait_for_delivery(&alice).await;

    let event = wait_for_event(&mut bob_events, |e| matches!(e, ChatEvent::Message(_))).await;
    let ChatEvent::Message(content) = event else {
        unreachable!()
    };
    assert_eq!(content["content"].as_str(), Some(big.as_str()));
}

#[tokio::test]
async fn test_client_recovers_after_relay_restart() {
    let mut relay = RelayProcess::spawn();
    relay.ready().await;
    let port = relay.port;

    let (chat, _events) = join(&relay, fast_config());
    wait_for_state(&chat, ConnectionState::Connected).await;

    relay.kill();
    wait_for_state(&chat, ConnectionState::Reconnecting).await;

    chat.send_chat_message("sent while down", None).unwrap();
    chat.watch_stats()
        .wait_for(|s| s.pending == 1)
        .await
        .unwrap();

    let relay = RelayProcess::spawn_on(port);
    relay.ready().await;
    wait_for_state(&chat, ConnectionState::Connected).await;
    wait_for_delivery(&chat).await;

    chat.disconnect().await.unwrap();
}
