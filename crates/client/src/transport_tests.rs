// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use chatlink_core::{codec, CompressionPolicy, Envelope, Frame};
use tokio::sync::mpsc;

use crate::transport::{Incoming, Transport, TransportError, TransportFuture};

#[derive(Default)]
struct MockShared {
    open: bool,
    connect_fail: bool,
    connect_hang: bool,
    send_fail: bool,
    send_hang: bool,
    connect_count: usize,
    sent: Vec<Frame>,
    closed_with: Vec<u16>,
}

/// Mock transport for testing without real sockets.
pub struct MockTransport {
    shared: Arc<Mutex<MockShared>>,
    incoming: mpsc::UnboundedReceiver<Incoming>,
}

/// Test-side control of a [`MockTransport`]: plays the server.
#[derive(Clone)]
pub struct MockRemote {
    shared: Arc<Mutex<MockShared>>,
    incoming: mpsc::UnboundedSender<Incoming>,
}

/// Creates a closed mock transport and its remote.
pub fn mock_transport() -> (MockTransport, MockRemote) {
    let shared = Arc::new(Mutex::new(MockShared::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MockTransport {
            shared: Arc::clone(&shared),
            incoming: rx,
        },
        MockRemote {
            shared,
            incoming: tx,
        },
    )
}

impl MockRemote {
    /// Queue a frame for the client to receive.
    pub fn push_frame(&self, frame: Frame) {
        self.incoming.send(Incoming::Frame(frame)).unwrap();
    }

    /// Queue an envelope as a text frame.
    pub fn push_envelope(&self, envelope: &Envelope) {
        self.push_frame(codec::encode(envelope, CompressionPolicy::disabled()).unwrap());
    }

    /// Close the session from the server side.
    pub fn close(&self, code: Option<u16>) {
        self.shared.lock().unwrap().open = false;
        self.incoming.send(Incoming::Closed(code)).unwrap();
    }

    /// Set whether connect should fail.
    pub fn set_connect_fail(&self, fail: bool) {
        self.shared.lock().unwrap().connect_fail = fail;
    }

    /// Set whether connect should never complete.
    pub fn set_connect_hang(&self, hang: bool) {
        self.shared.lock().unwrap().connect_hang = hang;
    }

    /// Set whether send on an open transport should never complete.
    pub fn set_send_hang(&self, hang: bool) {
        self.shared.lock().unwrap().send_hang = hang;
    }

    /// Set whether send should fail (and break the connection).
    pub fn set_send_fail(&self, fail: bool) {
        self.shared.lock().unwrap().send_fail = fail;
    }

    /// All frames the client sent.
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.shared.lock().unwrap().sent.clone()
    }

    /// All frames the client sent, decoded.
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        self.sent_frames()
            .iter()
            .map(|f| codec::decode(f).unwrap())
            .collect()
    }

    /// Number of connect calls.
    pub fn connect_count(&self) -> usize {
        self.shared.lock().unwrap().connect_count
    }

    /// Close codes the client closed with.
    pub fn closed_with(&self) -> Vec<u16> {
        self.shared.lock().unwrap().closed_with.clone()
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().unwrap().open
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _url: &str) -> TransportFuture<'_, ()> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let hang = {
                let mut shared = shared.lock().unwrap();
                shared.connect_count += 1;
                shared.connect_hang
            };
            if hang {
                std::future::pending::<()>().await;
            }
            let mut shared = shared.lock().unwrap();
            if shared.connect_fail {
                Err(TransportError::ConnectionFailed("mock failure".into()))
            } else {
                shared.open = true;
                Ok(())
            }
        })
    }

    fn close(&mut self, code: u16, _reason: &str) -> TransportFuture<'_, ()> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let mut shared = shared.lock().unwrap();
            shared.open = false;
            shared.closed_with.push(code);
            Ok(())
        })
    }

    fn send(&mut self, frame: Frame) -> TransportFuture<'_, ()> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let hang = {
                let shared = shared.lock().unwrap();
                shared.open && shared.send_hang
            };
            if hang {
                std::future::pending::<()>().await;
            }
            let mut shared = shared.lock().unwrap();
            if !shared.open {
                return Err(TransportError::ConnectionClosed);
            }
            if shared.send_fail {
                shared.open = false;
                return Err(TransportError::SendFailed("mock failure".into()));
            }
            shared.sent.push(frame);
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Incoming> {
        Box::pin(async move {
            match self.incoming.recv().await {
                Some(Incoming::Closed(code)) => {
                    self.shared.lock().unwrap().open = false;
                    Ok(Incoming::Closed(code))
                }
                Some(incoming) => Ok(incoming),
                None => {
                    self.shared.lock().unwrap().open = false;
                    Err(TransportError::ReceiveFailed("remote dropped".into()))
                }
            }
        })
    }

    fn is_open(&self) -> bool {
        self.shared.lock().unwrap().open
    }
}

#[tokio::test]
async fn test_mock_transport_connect_close() {
    let (mut transport, remote) = mock_transport();
    assert!(!transport.is_open());

    transport.connect("ws://localhost:1234").await.unwrap();
    assert!(transport.is_open());
    assert!(remote.is_open());
    assert_eq!(remote.connect_count(), 1);

    transport.close(1000, "bye").await.unwrap();
    assert!(!transport.is_open());
    assert_eq!(remote.closed_with(), vec![1000]);
}

#[tokio::test]
async fn test_mock_transport_send_recv() {
    let (mut transport, remote) = mock_transport();
    transport.connect("ws://localhost:1234").await.unwrap();

    transport.send(Frame::Text("hello".into())).await.unwrap();
    assert_eq!(remote.sent_frames(), vec![Frame::Text("hello".into())]);

    remote.push_frame(Frame::Binary(vec![1, 2, 3]));
    let received = transport.recv().await.unwrap();
    assert_eq!(received, Incoming::Frame(Frame::Binary(vec![1, 2, 3])));
}

#[tokio::test]
async fn test_mock_transport_remote_close() {
    let (mut transport, remote) = mock_transport();
    transport.connect("ws://localhost:1234").await.unwrap();

    remote.close(Some(1006));
    assert!(!transport.is_open());
    assert_eq!(transport.recv().await.unwrap(), Incoming::Closed(Some(1006)));
}

#[tokio::test]
async fn test_mock_transport_connect_fail() {
    let (mut transport, remote) = mock_transport();
    remote.set_connect_fail(true);

    let result = transport.connect("ws://localhost:1234").await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    assert!(!transport.is_open());
}

#[tokio::test]
async fn test_mock_transport_send_fail_closes() {
    let (mut transport, remote) = mock_transport();
    transport.connect("ws://localhost:1234").await.unwrap();
    remote.set_send_fail(true);

    let result = transport.send(Frame::Text("x".into())).await;
    assert!(matches!(result, Err(TransportError::SendFailed(_))));
    assert!(!transport.is_open());
}

#[tokio::test]
async fn test_websocket_transport_starts_closed() {
    let mut transport = crate::transport::WebSocketTransport::new();
    assert!(!transport.is_open());
    let result = transport.send(Frame::Text("x".into())).await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
}

#[tokio::test]
async fn test_websocket_transport_connect_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut transport = crate::transport::WebSocketTransport::new();
    let result = transport.connect(&format!("ws://{addr}/ws/chat/lobby/")).await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    assert!(!transport.is_open());
}

#[tokio::test(start_paused = true)]
async fn test_mock_transport_connect_hang() {
    let (mut transport, remote) = mock_transport();
    remote.set_connect_hang(true);

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(60),
        transport.connect("ws://localhost:1234"),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(remote.connect_count(), 1);
    assert!(!transport.is_open());
}
