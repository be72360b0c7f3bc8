// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Chat session supervisor.
//!
//! A [`ChatManager`] owns one room's transport session and everything that
//! hangs off it:
//! - Connection lifecycle with capped exponential-backoff reconnect
//! - Heartbeats while connected
//! - The outbound queue (pending, then awaiting acknowledgment, with retries)
//! - Inbound decoding, duplicate suppression and routing to a [`ChatHandler`]
//!
//! The manager's methods can be driven directly (tests do), but normally it
//! is moved onto its own task with [`ChatManager::spawn`] and used through
//! the returned [`ChatHandle`].

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chatlink_core::{
    codec, ChatConfig, ClockSource, ConnectionState, Endpoint, Envelope, Frame, MessageId,
    MessageKind, SystemClock,
};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ChatResult;
use crate::handle::{ChatHandle, Command};
use crate::handler::ChatHandler;
use crate::outbound::{OutboundMessage, OutboundQueue, SendOptions};
use crate::seen::SeenIds;
use crate::transport::{Incoming, Transport, TransportError, TransportResult, WebSocketTransport};

/// Close code sent on a deliberate disconnect, and the peer code that
/// suppresses reconnecting.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Queue sizes published to handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Messages not yet transmitted.
    pub pending: usize,
    /// Transmitted messages without an acknowledgment.
    pub unacknowledged: usize,
    /// Sends accepted by a handle that the session has not queued yet.
    pub submitted: usize,
}

/// One unit of session work, run while still watching for a disconnect.
enum Step {
    Connect,
    Command(Command),
    Incoming(TransportResult<Incoming>),
    Heartbeat,
    Reconnect,
    Sweep,
}

/// A reconnect waiting out its backoff delay.
#[derive(Debug, Clone, Copy)]
struct PendingReconnect {
    delay: Duration,
    at: Instant,
}

/// Why a message could not be transmitted.
#[derive(Debug, thiserror::Error)]
enum TransmitError {
    #[error(transparent)]
    Encode(#[from] codec::CodecError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Resilient chat session for one room.
pub struct ChatManager<T: Transport = WebSocketTransport, C: ClockSource = SystemClock> {
    room: String,
    url: String,
    config: ChatConfig,
    transport: T,
    clock: C,
    handler: Box<dyn ChatHandler>,
    state: ConnectionState,
    queue: OutboundQueue,
    seen: SeenIds,
    reconnect_attempts: u32,
    reconnect: Option<PendingReconnect>,
    next_heartbeat: Option<Instant>,
    closed_by_user: bool,
    online: bool,
    state_tx: watch::Sender<ConnectionState>,
    stats_tx: Arc<watch::Sender<QueueStats>>,
}

impl ChatManager<WebSocketTransport, SystemClock> {
    /// Create a manager for `room` over a WebSocket transport.
    pub fn new(
        room: &str,
        endpoint: &Endpoint,
        config: ChatConfig,
        handler: impl ChatHandler + 'static,
    ) -> ChatResult<Self> {
        Self::with_transport(
            room,
            endpoint,
            config,
            handler,
            WebSocketTransport::new(),
            SystemClock,
        )
    }
}

impl<T: Transport, C: ClockSource> ChatManager<T, C> {
    /// Create a manager with a custom transport and clock (for testing).
    pub fn with_transport(
        room: &str,
        endpoint: &Endpoint,
        config: ChatConfig,
        handler: impl ChatHandler + 'static,
        transport: T,
        clock: C,
    ) -> ChatResult<Self> {
        config.validate()?;
        let url = endpoint.room_url(room)?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (stats_tx, _) = watch::channel(QueueStats::default());

        Ok(ChatManager {
            room: room.to_string(),
            url,
            seen: SeenIds::new(config.seen_capacity),
            config,
            transport,
            clock,
            handler: Box::new(handler),
            state: ConnectionState::Disconnected,
            queue: OutboundQueue::new(),
            reconnect_attempts: 0,
            reconnect: None,
            next_heartbeat: None,
            closed_by_user: false,
            online: true,
            state_tx,
            stats_tx: Arc::new(stats_tx),
        })
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of messages waiting to be transmitted.
    pub fn pending_count(&self) -> usize {
        self.queue.pending_len()
    }

    /// Number of transmitted messages without an acknowledgment.
    pub fn unacknowledged_count(&self) -> usize {
        self.queue.awaiting_len()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Delay of the scheduled reconnect, if one is pending.
    pub fn pending_reconnect(&self) -> Option<Duration> {
        self.reconnect.map(|r| r.delay)
    }

    /// Returns true while a heartbeat is scheduled.
    pub fn heartbeat_scheduled(&self) -> bool {
        self.next_heartbeat.is_some()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to queue size changes.
    pub fn watch_stats(&self) -> watch::Receiver<QueueStats> {
        self.stats_tx.subscribe()
    }

    /// Open the transport session.
    ///
    /// No-op if a session is already open. A failed or timed-out open is
    /// treated as a transport error followed by an abnormal close, which may
    /// schedule a reconnect.
    pub async fn connect(&mut self) {
        if self.transport.is_open() {
            if self.state != ConnectionState::Connected {
                // Offline signal left the state stale
                self.on_open().await;
            }
            return;
        }

        self.closed_by_user = false;
        self.reconnect = None;
        self.set_state(ConnectionState::Connecting);
        info!(room = %self.room, url = %self.url, "connecting");

        let limit = self.config.connect_timeout();
        let opened = match tokio::time::timeout(limit, self.transport.connect(&self.url)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectionFailed(format!(
                "timed out after {}ms",
                limit.as_millis()
            ))),
        };
        match opened {
            Ok(()) => {
                info!(room = %self.room, "connected");
                self.on_open().await;
            }
            Err(e) => {
                warn!(room = %self.room, error = %e, "connection failed");
                self.set_state(ConnectionState::Error);
                self.on_close(None);
            }
        }
    }

    /// Close the session deliberately. No reconnect follows.
    pub async fn disconnect(&mut self) {
        self.closed_by_user = true;
        self.reconnect = None;
        self.next_heartbeat = None;
        if self.transport.is_open() {
            let limit = self.config.connect_timeout();
            let close = self.transport.close(NORMAL_CLOSURE, "client disconnect");
            match tokio::time::timeout(limit, close).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "close handshake failed"),
                Err(_) => debug!("close handshake timed out"),
            }
        }
        info!(room = %self.room, "disconnected");
        self.set_state(ConnectionState::Disconnected);
    }

    async fn on_open(&mut self) {
        self.reconnect_attempts = 0;
        self.set_state(ConnectionState::Connected);
        self.next_heartbeat = Some(Instant::now() + self.config.heartbeat_interval());
        self.flush_pending().await;
    }

    fn on_close(&mut self, code: Option<u16>) {
        self.next_heartbeat = None;
        self.set_state(ConnectionState::Disconnected);

        if self.closed_by_user || code == Some(NORMAL_CLOSURE) {
            return;
        }
        if self.reconnect_attempts < self.config.max_reconnect_attempts {
            self.schedule_reconnect();
        } else {
            warn!(
                room = %self.room,
                attempts = self.reconnect_attempts,
                "giving up on reconnecting"
            );
        }
    }

    /// Schedule the next reconnect after the backoff delay, replacing any
    /// reconnect already pending. Returns the delay.
    pub fn schedule_reconnect(&mut self) -> Duration {
        let delay = self.config.backoff().delay(self.reconnect_attempts);
        self.reconnect_attempts += 1;
        self.set_state(ConnectionState::Reconnecting);
        self.reconnect = Some(PendingReconnect {
            delay,
            at: Instant::now() + delay,
        });
        info!(
            room = %self.room,
            attempt = self.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        delay
    }

    /// Run the pending reconnect now, ignoring its remaining delay.
    pub async fn fire_reconnect(&mut self) {
        if self.reconnect.take().is_some() {
            self.connect().await;
        }
    }

    /// Accept a message for delivery and return its id.
    ///
    /// The message is transmitted immediately if connected, otherwise on the
    /// next successful open. Heartbeat kinds bypass the queue and are
    /// dropped while not connected.
    pub async fn send(
        &mut self,
        kind: MessageKind,
        content: Value,
        options: SendOptions,
    ) -> MessageId {
        let id = MessageId::generate();
        self.enqueue(id.clone(), kind, content, options, false).await;
        id
    }

    pub(crate) async fn enqueue(
        &mut self,
        id: MessageId,
        kind: MessageKind,
        content: Value,
        options: SendOptions,
        submitted: bool,
    ) {
        if kind.is_control() {
            self.send_control(kind, content).await;
            return;
        }

        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);
        debug!(id = %id, kind = %kind, "queued");
        self.queue
            .push(id, kind, content, self.clock.now_ms(), max_retries);

        let (pending, unacknowledged) = (self.queue.pending_len(), self.queue.awaiting_len());
        self.stats_tx.send_modify(|stats| {
            if submitted {
                stats.submitted = stats.submitted.saturating_sub(1);
            }
            stats.pending = pending;
            stats.unacknowledged = unacknowledged;
        });

        if self.state == ConnectionState::Connected {
            self.flush_pending().await;
        }
    }

    /// Retry expired messages, then transmit everything pending in order.
    ///
    /// Stops at the first transport failure, leaving that message at the
    /// head of the queue.
    pub async fn flush_pending(&mut self) {
        self.retry_unacknowledged();

        while self.state == ConnectionState::Connected {
            let Some(message) = self.queue.pop_pending() else {
                break;
            };
            match self.transmit(&message).await {
                Ok(()) => self.queue.mark_sent(message),
                Err(TransmitError::Encode(e)) => {
                    warn!(id = %message.id, error = %e, "dropping unencodable message");
                    self.handler.on_delivery_failed(&message.id, &message.kind);
                }
                Err(TransmitError::Transport(e)) => {
                    warn!(id = %message.id, error = %e, "send failed, message stays queued");
                    self.queue.unpop(message);
                    break;
                }
            }
        }

        self.publish_stats();
        self.check_transport();
    }

    async fn transmit(&mut self, message: &OutboundMessage) -> Result<(), TransmitError> {
        let frame = codec::encode(&message.envelope(), self.config.compression())?;
        debug!(
            id = %message.id,
            kind = %message.kind,
            retry = message.retry_count,
            bytes = frame.len(),
            binary = frame.is_binary(),
            "transmit"
        );
        self.transport.send(frame).await?;
        Ok(())
    }

    /// Requeue unacknowledged messages older than the acknowledgment
    /// timeout, evicting those that have used up their retries.
    pub fn retry_unacknowledged(&mut self) {
        let now = self.clock.now_ms();
        let sweep = self.queue.sweep(now, self.config.ack_timeout_ms);

        for id in &sweep.requeued {
            debug!(id = %id, "retrying unacknowledged message");
        }
        for message in sweep.exhausted {
            warn!(
                id = %message.id,
                kind = %message.kind,
                retries = message.retry_count,
                "message not acknowledged, giving up"
            );
            self.handler.on_delivery_failed(&message.id, &message.kind);
        }
        self.publish_stats();
    }

    /// Send a heartbeat and schedule the next one.
    pub async fn heartbeat(&mut self) {
        if self.state != ConnectionState::Connected {
            self.next_heartbeat = None;
            return;
        }
        self.next_heartbeat = Some(Instant::now() + self.config.heartbeat_interval());
        self.send_control(MessageKind::Heartbeat, Value::Null).await;
    }

    async fn send_control(&mut self, kind: MessageKind, content: Value) {
        if self.state != ConnectionState::Connected {
            debug!(kind = %kind, "not connected, dropping control frame");
            return;
        }
        let envelope =
            Envelope::new(kind, content, self.clock.now_ms()).with_id(MessageId::generate());
        let frame = match codec::encode(&envelope, self.config.compression()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind = %envelope.kind, error = %e, "failed to encode control frame");
                return;
            }
        };
        if let Err(e) = self.transport.send(frame).await {
            warn!(kind = %envelope.kind, error = %e, "failed to send control frame");
        }
        self.check_transport();
    }

    /// Treat a transport that dropped underneath a connected session as an
    /// abnormal close.
    fn check_transport(&mut self) {
        if self.state == ConnectionState::Connected && !self.transport.is_open() {
            warn!(room = %self.room, "transport lost");
            self.set_state(ConnectionState::Error);
            self.on_close(None);
        }
    }

    /// Wait for one transport event and process it.
    pub async fn recv_next(&mut self) {
        let incoming = self.transport.recv().await;
        self.handle_incoming(incoming).await;
    }

    /// Process the result of a transport receive.
    pub async fn handle_incoming(&mut self, incoming: TransportResult<Incoming>) {
        match incoming {
            Ok(Incoming::Frame(frame)) => self.handle_frame(frame).await,
            Ok(Incoming::Closed(code)) => {
                info!(room = %self.room, code = ?code, "connection closed by peer");
                self.on_close(code);
            }
            Err(e) => {
                warn!(room = %self.room, error = %e, "transport error");
                self.set_state(ConnectionState::Error);
                self.on_close(None);
            }
        }
    }

    /// Decode one inbound frame, match acknowledgments, drop duplicates and
    /// route the rest.
    pub async fn handle_frame(&mut self, frame: Frame) {
        let envelope = match codec::decode(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(bytes = frame.len(), error = %e, "dropping undecodable frame");
                return;
            }
        };

        if let Some(id) = &envelope.id {
            if self.queue.acknowledge(id.as_str()).is_some() {
                debug!(id = %id, "acknowledged");
                self.publish_stats();
            }
            if !self.seen.insert(id.clone()) {
                debug!(id = %id, kind = %envelope.kind, "duplicate frame dropped");
                return;
            }
        }

        self.dispatch(envelope).await;
    }

    async fn dispatch(&mut self, envelope: Envelope) {
        let Envelope { kind, content, .. } = envelope;
        match kind {
            MessageKind::Heartbeat => {
                self.send_control(MessageKind::HeartbeatAck, Value::Null)
                    .await;
            }
            MessageKind::HeartbeatAck | MessageKind::Ack => {}
            MessageKind::ConnectionStateUpdate => {
                let state = content
                    .get("state")
                    .and_then(Value::as_str)
                    .map(str::parse::<ConnectionState>);
                match state {
                    Some(Ok(state)) => self.handler.on_state_change(state),
                    _ => warn!(content = %content, "malformed connection_state frame"),
                }
            }
            MessageKind::ConnectionEstablished => {
                info!(room = %self.room, content = %content, "server confirmed connection");
            }
            MessageKind::ChatMessage => self.handler.on_message(content),
            MessageKind::UserJoined => self.handler.on_user_joined(content),
            MessageKind::UserLeft => self.handler.on_user_left(content),
            MessageKind::TypingStatus => self.handler.on_typing(content),
            MessageKind::ReadStatusUpdate => self.handler.on_read_status(content),
            other => debug!(kind = %other, "unhandled message kind"),
        }
    }

    /// Connectivity signal from the host.
    pub async fn network_changed(&mut self, online: bool) {
        self.online = online;
        if online {
            info!(room = %self.room, "network back online");
            self.check_connection().await;
        } else {
            warn!(room = %self.room, "network offline");
            self.set_state(ConnectionState::Error);
        }
    }

    /// Foreground/background signal from the host.
    pub async fn visibility_changed(&mut self, visible: bool) {
        if visible {
            self.check_connection().await;
        }
    }

    async fn check_connection(&mut self) {
        if self.state != ConnectionState::Connected && self.online && !self.closed_by_user {
            self.connect().await;
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!(room = %self.room, from = %self.state, to = %state, "state change");
        self.state = state;
        self.state_tx.send_replace(state);
        self.handler.on_state_change(state);
    }

    fn publish_stats(&self) {
        let (pending, unacknowledged) = (self.queue.pending_len(), self.queue.awaiting_len());
        self.stats_tx.send_if_modified(|current| {
            let changed = current.pending != pending || current.unacknowledged != unacknowledged;
            current.pending = pending;
            current.unacknowledged = unacknowledged;
            changed
        });
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send {
                id,
                kind,
                content,
                options,
            } => self.enqueue(id, kind, content, options, true).await,
            Command::NetworkChanged(online) => self.network_changed(online).await,
            Command::VisibilityChanged(visible) => self.visibility_changed(visible).await,
            Command::Disconnect(done) => {
                self.disconnect().await;
                let _ = done.send(());
            }
        }
    }
}

impl<T, C> ChatManager<T, C>
where
    T: Transport + 'static,
    C: ClockSource + 'static,
{
    /// Move the session onto its own task and connect.
    ///
    /// The task ends on [`ChatHandle::disconnect`] or once every handle has
    /// been dropped.
    pub fn spawn(self) -> ChatHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ChatHandle::new(tx, self.watch_state(), Arc::clone(&self.stats_tx));
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut held = VecDeque::new();
        self.publish_stats();
        if self.guarded(Step::Connect, &mut commands, &mut held).await {
            return;
        }

        let mut sweep = tokio::time::interval(self.config.retry_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let step = match held.pop_front() {
                Some(command) => Step::Command(command),
                None => {
                    let open = self.transport.is_open();
                    let heartbeat_at = self.next_heartbeat;
                    let reconnect_at = self.reconnect.map(|r| r.at);

                    tokio::select! {
                        command = commands.recv() => match command {
                            Some(command) => Step::Command(command),
                            None => {
                                debug!(room = %self.room, "all handles dropped");
                                self.disconnect().await;
                                break;
                            }
                        },
                        incoming = self.transport.recv(), if open => Step::Incoming(incoming),
                        () = sleep_until_opt(heartbeat_at) => Step::Heartbeat,
                        () = sleep_until_opt(reconnect_at) => Step::Reconnect,
                        _ = sweep.tick() => Step::Sweep,
                    }
                }
            };

            let stop = matches!(step, Step::Command(Command::Disconnect(_)));
            if self.guarded(step, &mut commands, &mut held).await || stop {
                break;
            }
        }
    }

    /// Run `step` while watching the command channel.
    ///
    /// A disconnect, or the last handle going away, abandons the step and
    /// closes the session; returns true in that case. Any other command is
    /// held for the main loop.
    async fn guarded(
        &mut self,
        step: Step,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        held: &mut VecDeque<Command>,
    ) -> bool {
        let abandoned = {
            let work = self.step(step);
            tokio::pin!(work);
            loop {
                tokio::select! {
                    () = &mut work => break None,
                    command = commands.recv() => match command {
                        Some(Command::Disconnect(done)) => break Some(Some(done)),
                        Some(command) => held.push_back(command),
                        None => break Some(None),
                    },
                }
            }
        };

        let Some(done) = abandoned else {
            return false;
        };
        debug!(room = %self.room, state = %self.state, "abandoning in-flight work");
        self.disconnect().await;
        if let Some(done) = done {
            let _ = done.send(());
        }
        true
    }

    async fn step(&mut self, step: Step) {
        match step {
            Step::Connect => self.connect().await,
            Step::Command(command) => self.handle_command(command).await,
            Step::Incoming(incoming) => self.handle_incoming(incoming).await,
            Step::Heartbeat => self.heartbeat().await,
            Step::Reconnect => self.fire_reconnect().await,
            Step::Sweep => {
                if self.state == ConnectionState::Connected {
                    self.flush_pending().await;
                }
            }
        }
    }
}

/// Sleep until `deadline`, or forever if there is none.
fn sleep_until_opt(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}
