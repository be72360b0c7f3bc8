// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Handles client connections, per-frame replies and room fanout.
//!
//! # Coverage Notes
//!
//! `handle_client_frame` holds all per-frame decisions and is tested
//! directly; `run` and `handle_connection` are exercised through
//! `TestServer` and the binary integration tests.

use std::net::SocketAddr;

use chatlink_core::{
    codec, ClockSource, CodecError, CompressionPolicy, Envelope, Frame, MessageId, MessageKind,
    SystemClock,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval_at, Instant, Interval};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::state::RelayState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What the relay does in response to one client frame.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Reply {
    /// Frames for the sender only, in order.
    pub direct: Vec<Envelope>,
    /// Frame for everyone in the room.
    pub broadcast: Option<Envelope>,
}

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: RelayState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);
    accept_loop(listener, state)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    Ok(())
}

/// Accept connections forever, one task each.
pub(crate) async fn accept_loop(listener: TcpListener, state: RelayState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: RelayState,
) -> Result<(), BoxError> {
    let mut room = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            match chatlink_core::endpoint::room_from_path(request.uri().path()) {
                Some(name) => {
                    room = Some(name.to_string());
                    Ok(response)
                }
                None => {
                    let mut reject = ErrorResponse::new(Some("no such room".to_string()));
                    *reject.status_mut() = StatusCode::NOT_FOUND;
                    Err(reject)
                }
            }
        },
    )
    .await?;
    let Some(room) = room else {
        return Ok(());
    };

    let config = state.config();
    let (member, mut room_rx) = state.join(&room).await;
    info!("{} joined room '{}' as {}", peer_addr, room, member.username);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let established = server_envelope(
        MessageKind::ConnectionEstablished,
        json!({"room": room, "username": member.username}),
    );
    send_envelope(&mut ws_sink, &established, config.compression).await?;
    member.broadcast_others(server_envelope(
        MessageKind::UserJoined,
        json!({"username": member.username}),
    ));

    let mut heartbeat = config
        .heartbeat
        .map(|period| interval_at(Instant::now() + period, period));

    let result: Result<(), BoxError> = async {
        loop {
            tokio::select! {
                // Handle incoming frames from the client
                msg = ws_stream.next() => {
                    let frame = match msg {
                        Some(Ok(Message::Text(text))) => Frame::Text(text.as_str().to_string()),
                        Some(Ok(Message::Binary(bytes))) => Frame::Binary(bytes.to_vec()),
                        Some(Ok(Message::Close(_))) => {
                            info!("Client {} disconnected", peer_addr);
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            ws_sink.send(Message::Pong(data)).await?;
                            continue;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!("WebSocket error from {}: {}", peer_addr, e);
                            break;
                        }
                        None => {
                            info!("Client {} stream ended", peer_addr);
                            break;
                        }
                    };

                    match handle_client_frame(&frame, &member.username, SystemClock.now_ms()) {
                        Ok(reply) => {
                            for envelope in &reply.direct {
                                send_envelope(&mut ws_sink, envelope, config.compression).await?;
                            }
                            if let Some(envelope) = reply.broadcast {
                                member.broadcast(envelope);
                            }
                        }
                        Err(e) => warn!("Dropping bad frame from {}: {}", peer_addr, e),
                    }
                }

                // Handle room events to send to the client
                event = room_rx.recv() => {
                    match event {
                        Ok(event) if member.wants(&event) => {
                            send_envelope(&mut ws_sink, &event.envelope, config.compression).await?;
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Client {} lagged by {} messages", peer_addr, n);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }

                _ = next_beat(&mut heartbeat), if heartbeat.is_some() => {
                    let beat = server_envelope(MessageKind::Heartbeat, Value::Null);
                    send_envelope(&mut ws_sink, &beat, config.compression).await?;
                }
            }
        }
        Ok(())
    }
    .await;

    member.broadcast_others(server_envelope(
        MessageKind::UserLeft,
        json!({"username": member.username}),
    ));
    state.leave(&member, room_rx).await;
    info!("Connection closed: {}", peer_addr);
    result
}

/// Process a client frame and decide the replies.
pub(crate) fn handle_client_frame(
    frame: &Frame,
    username: &str,
    now_ms: u64,
) -> Result<Reply, CodecError> {
    let envelope = codec::decode(frame)?;
    debug!("Received {} from {}", envelope.kind, username);

    let mut reply = Reply::default();
    if let Some(id) = &envelope.id {
        reply.direct.push(Envelope::ack(id.clone(), now_ms));
    }

    let content = &envelope.content;
    let field = |key: &str| content.get(key).cloned().unwrap_or(Value::Null);
    let chat = |message_type: Value, body: Value| {
        Envelope::new(
            MessageKind::ChatMessage,
            json!({
                "username": username,
                "message_type": message_type,
                "content": body,
                "message_id": envelope.id,
            }),
            now_ms,
        )
        .with_id(MessageId::generate())
    };

    match &envelope.kind {
        MessageKind::Heartbeat => {
            reply.direct.push(
                Envelope::new(MessageKind::HeartbeatAck, Value::Null, now_ms)
                    .with_id(MessageId::generate()),
            );
        }
        MessageKind::Message => {
            let message_type = match field("message_type") {
                Value::Null => Value::from("text"),
                other => other,
            };
            reply.broadcast = Some(chat(message_type, field("content")));
        }
        MessageKind::FileUpload => reply.broadcast = Some(chat("file".into(), field("file_data"))),
        MessageKind::ImageMessage => {
            reply.broadcast = Some(chat("image".into(), field("image_data")));
        }
        MessageKind::VoiceMessage => {
            reply.broadcast = Some(chat("voice".into(), field("voice_data")));
        }
        MessageKind::VideoMessage => {
            reply.broadcast = Some(chat("video".into(), field("video_data")));
        }
        MessageKind::Typing => {
            reply.broadcast = Some(
                Envelope::new(
                    MessageKind::TypingStatus,
                    json!({
                        "username": username,
                        "typing": field("typing").as_bool().unwrap_or(false),
                    }),
                    now_ms,
                )
                .with_id(MessageId::generate()),
            );
        }
        MessageKind::ReadStatus => {
            reply.broadcast = Some(
                Envelope::new(
                    MessageKind::ReadStatusUpdate,
                    json!({"username": username, "message_id": field("message_id")}),
                    now_ms,
                )
                .with_id(MessageId::generate()),
            );
        }
        other => debug!("Ignoring {} from {}", other, username),
    }

    Ok(reply)
}

async fn next_beat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn server_envelope(kind: MessageKind, content: Value) -> Envelope {
    Envelope::new(kind, content, SystemClock.now_ms()).with_id(MessageId::generate())
}

async fn send_envelope<S>(
    sink: &mut S,
    envelope: &Envelope,
    compression: CompressionPolicy,
) -> Result<(), BoxError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let message = match codec::encode(envelope, compression)? {
        Frame::Text(text) => Message::text(text),
        Frame::Binary(bytes) => Message::binary(bytes),
    };
    sink.send(message).await?;
    Ok(())
}
