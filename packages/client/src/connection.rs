//! Channel connection: the lifecycle state machine.
//!
//! The connection exclusively owns the transport and is the only writer of
//! the presence roster and the message log. Every transport or protocol
//! failure is absorbed here and turned into a state transition or a system
//! message; nothing is returned to the caller as an error.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──join ack──▶ Connected
//!                     │    ▲                    │
//!        error/timeout│    │timer fires         │transport closed
//!                     ▼    │                    │
//!                  Reconnecting ◀───────────────┘
//!
//! Connecting/Connected/Reconnecting ──disconnect──▶ Closed
//! ```

use std::sync::Arc;

use tokio::{sync::watch, time::Instant};

use agora_shared::time::Clock;

use crate::{
    config::ChatConfig,
    domain::{
        ConnectionState, Identity, LogSnapshot, Message, MessageKind, MessageLog, Participant,
        PresenceRoster, Timer, should_attempt_reconnect, timer::sleep_until_deadline,
    },
    protocol::{InboundEvent, OutboundFrame, encode_outbound, parse_inbound},
    transport::{Transport, TransportError, TransportEvent, TransportEvents},
};

/// Sender name used when neither the frame nor the roster knows the sender
const UNKNOWN_SENDER: &str = "unknown";

/// Something the connection has to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// An event from the open transport; `None` when its handlers were dropped
    Transport(Option<TransportEvent>),
    ReconnectDue,
    JoinTimeout,
    TypingExpiry,
}

struct Observers {
    state: watch::Sender<ConnectionState>,
    roster: watch::Sender<Vec<Participant>>,
    log: watch::Sender<LogSnapshot>,
}

pub struct ChannelConnection<T: Transport> {
    transport: T,
    events: Option<TransportEvents>,
    config: ChatConfig,
    clock: Arc<dyn Clock>,
    state: ConnectionState,
    identity: Option<Identity>,
    /// Own participant id, known once the join is acknowledged
    self_id: Option<String>,
    attempt: u32,
    reconnect_timer: Timer,
    join_timer: Timer,
    roster: PresenceRoster,
    log: MessageLog,
    observers: Observers,
}

async fn recv_event(events: Option<&mut TransportEvents>) -> Option<TransportEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

impl<T: Transport> ChannelConnection<T> {
    pub fn new(transport: T, config: ChatConfig, clock: Arc<dyn Clock>) -> Self {
        let log = if config.dedupe_messages {
            MessageLog::with_dedupe()
        } else {
            MessageLog::new()
        };
        Self {
            transport,
            events: None,
            config,
            clock,
            state: ConnectionState::Idle,
            identity: None,
            self_id: None,
            attempt: 0,
            reconnect_timer: Timer::default(),
            join_timer: Timer::default(),
            roster: PresenceRoster::new(),
            log,
            observers: Observers {
                state: watch::Sender::new(ConnectionState::Idle),
                roster: watch::Sender::new(Vec::new()),
                log: watch::Sender::new(LogSnapshot::default()),
            },
        }
    }

    // ========================================
    // Observers
    // ========================================

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn roster(&self) -> &PresenceRoster {
        &self.roster
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Reconnect attempts made since the last successful join
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_timer.deadline()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.observers.state.subscribe()
    }

    pub fn subscribe_roster(&self) -> watch::Receiver<Vec<Participant>> {
        self.observers.roster.subscribe()
    }

    pub fn subscribe_log(&self) -> watch::Receiver<LogSnapshot> {
        self.observers.log.subscribe()
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::info!("Connection state: {} -> {}", self.state, state);
            self.state = state;
            self.observers.state.send_replace(state);
        }
    }

    fn publish_roster(&self) {
        self.observers.roster.send_replace(self.roster.snapshot());
    }

    fn publish_log(&self) {
        self.observers.log.send_replace(self.log.snapshot());
    }

    fn append_system(&mut self, text: String) {
        self.log.append(Message::system(text, self.clock.now()));
        self.publish_log();
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Start connecting as `identity`. Only legal from `Idle` or `Closed`.
    pub async fn connect(&mut self, identity: Identity) {
        if !matches!(self.state, ConnectionState::Idle | ConnectionState::Closed) {
            tracing::debug!("Ignoring connect() in state {}", self.state);
            return;
        }
        tracing::info!("Connecting as '{}'", identity.username);
        self.identity = Some(identity);
        self.attempt = 0;
        self.open_and_join().await;
    }

    /// Close the channel on behalf of the local user.
    ///
    /// Cancels every pending timer and drops the transport event receiver
    /// before returning.
    pub async fn disconnect(&mut self) {
        if !self.state.is_active() {
            tracing::debug!("Ignoring disconnect() in state {}", self.state);
            return;
        }
        self.detach_transport().await;
        self.reconnect_timer.cancel();
        self.roster.clear();
        self.self_id = None;
        self.publish_roster();
        self.set_state(ConnectionState::Closed);
        tracing::info!("Disconnected");
    }

    async fn open_and_join(&mut self) {
        let Some(username) = self.identity.as_ref().map(|i| i.username.clone()) else {
            return;
        };
        self.set_state(ConnectionState::Connecting);

        // The join deadline covers the handshake as well as the ack
        let now = Instant::now();
        self.join_timer.arm(now, self.config.join_timeout);
        let opened =
            tokio::time::timeout_at(now + self.config.join_timeout, self.transport.open()).await;

        match opened {
            Ok(Ok(events)) => {
                self.events = Some(events);
                let join = OutboundFrame::Join { username };
                if let Err(e) = self.send_frame(&join).await {
                    tracing::warn!("Failed to send join: {}", e);
                    self.on_transport_lost(&e.to_string()).await;
                }
            }
            Ok(Err(e)) => self.on_open_failed(e).await,
            Err(_) => self.on_open_failed(TransportError::Timeout).await,
        }
    }

    async fn on_open_failed(&mut self, error: TransportError) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        match error {
            TransportError::Rejected { status } => {
                tracing::error!("Server rejected the connection (HTTP {})", status);
                self.close_with_notice(format!(
                    "Server rejected the connection (HTTP {status})"
                ))
                .await;
            }
            e => {
                tracing::warn!("Failed to connect: {}", e);
                self.detach_transport().await;
                self.schedule_reconnect(false).await;
            }
        }
    }

    async fn detach_transport(&mut self) {
        self.events = None;
        self.join_timer.cancel();
        self.transport.close().await;
    }

    /// The transport went away without a local `disconnect()`.
    async fn on_transport_lost(&mut self, reason: &str) {
        let was_connected = match self.state {
            ConnectionState::Connected => true,
            ConnectionState::Connecting => false,
            _ => {
                self.events = None;
                return;
            }
        };
        tracing::warn!("Connection lost: {}", reason);
        self.detach_transport().await;
        self.schedule_reconnect(was_connected).await;
    }

    async fn schedule_reconnect(&mut self, was_connected: bool) {
        if !should_attempt_reconnect(self.attempt, self.config.max_reconnect_attempts) {
            tracing::error!("Failed to reconnect after {} attempts", self.attempt);
            self.close_with_notice(format!(
                "Gave up reconnecting after {} attempts",
                self.attempt
            ))
            .await;
            return;
        }

        let delay = self.config.backoff.next_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.reconnect_timer.arm(Instant::now(), delay);
        tracing::info!(
            "Reconnecting in {} ms (attempt {})",
            delay.as_millis(),
            self.attempt
        );

        if was_connected {
            self.append_system(format!(
                "Disconnected from chat server; reconnecting in {:.1}s",
                delay.as_secs_f64()
            ));
        }
        self.set_state(ConnectionState::Reconnecting);
    }

    /// Terminal close that was not requested locally.
    async fn close_with_notice(&mut self, notice: String) {
        self.detach_transport().await;
        self.reconnect_timer.cancel();
        self.roster.clear();
        self.self_id = None;
        self.publish_roster();
        self.append_system(notice);
        self.set_state(ConnectionState::Closed);
    }

    // ========================================
    // Event loop plumbing
    // ========================================

    /// Wait for the next transport event or timer expiry.
    ///
    /// Cancel-safe; pending forever when nothing is open or armed.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        let reconnect_at = self.reconnect_timer.deadline();
        let join_deadline = self.join_timer.deadline();
        let typing_expiry = self
            .config
            .typing_ttl
            .and_then(|ttl| self.roster.next_typing_expiry(ttl));
        let events = self.events.as_mut();

        // Timers first: each one is disarmed when handled, so a busy
        // transport cannot hold them off
        tokio::select! {
            biased;
            () = sleep_until_deadline(join_deadline) => ConnectionEvent::JoinTimeout,
            () = sleep_until_deadline(reconnect_at) => ConnectionEvent::ReconnectDue,
            () = sleep_until_deadline(typing_expiry) => ConnectionEvent::TypingExpiry,
            event = recv_event(events) => ConnectionEvent::Transport(event),
        }
    }

    pub async fn handle(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Transport(Some(TransportEvent::Frame(text))) => {
                self.handle_inbound(parse_inbound(&text));
            }
            ConnectionEvent::Transport(Some(TransportEvent::Error(reason))) => {
                self.events = None;
                self.on_transport_lost(&reason).await;
            }
            ConnectionEvent::Transport(Some(TransportEvent::Failed(error))) => {
                self.events = None;
                self.on_open_failed(error).await;
            }
            ConnectionEvent::Transport(Some(TransportEvent::Closed) | None) => {
                self.events = None;
                self.on_transport_lost("connection closed by server").await;
            }
            ConnectionEvent::ReconnectDue => self.on_reconnect_due().await,
            ConnectionEvent::JoinTimeout => self.on_join_timeout().await,
            ConnectionEvent::TypingExpiry => self.on_typing_expiry(),
        }
    }

    /// Reconnect timer fired. No-op unless still `Reconnecting`.
    pub async fn on_reconnect_due(&mut self) {
        if !self.reconnect_timer.fire_if_due(Instant::now())
            || self.state != ConnectionState::Reconnecting
        {
            return;
        }
        self.open_and_join().await;
    }

    /// Join acknowledgment did not arrive in time.
    pub async fn on_join_timeout(&mut self) {
        if !self.join_timer.fire_if_due(Instant::now())
            || self.state != ConnectionState::Connecting
        {
            return;
        }
        self.on_transport_lost("timed out waiting for join acknowledgment")
            .await;
    }

    pub fn on_typing_expiry(&mut self) {
        if let Some(ttl) = self.config.typing_ttl
            && self.roster.expire_typing(Instant::now(), ttl)
        {
            self.publish_roster();
        }
    }

    // ========================================
    // Inbound
    // ========================================

    fn resolve_sender_name(&self, message: &mut Message) {
        if !message.sender_name.is_empty() {
            return;
        }
        message.sender_name = message
            .sender_id
            .as_deref()
            .and_then(|id| self.roster.get(id))
            .map_or_else(|| UNKNOWN_SENDER.to_string(), |p| p.username.clone());
    }

    fn handle_inbound(&mut self, event: InboundEvent) {
        match (self.state, event) {
            (
                ConnectionState::Connecting,
                InboundEvent::JoinAck {
                    participant_id,
                    roster,
                    history,
                },
            ) => {
                self.join_timer.cancel();
                self.attempt = 0;
                self.roster.reset(roster);
                let history = history
                    .into_iter()
                    .map(|mut message| {
                        self.resolve_sender_name(&mut message);
                        message
                    })
                    .collect();
                self.log.replace_history(history);
                tracing::info!(
                    "Joined as '{}' ({} participants, {} history messages)",
                    participant_id,
                    self.roster.len(),
                    self.log.len()
                );
                self.self_id = Some(participant_id);
                self.publish_roster();
                self.publish_log();
                self.set_state(ConnectionState::Connected);
            }
            (ConnectionState::Connected, InboundEvent::Message(mut message)) => {
                self.resolve_sender_name(&mut message);
                if self.log.append(message) {
                    self.publish_log();
                }
            }
            (ConnectionState::Connected, InboundEvent::PresenceJoin(participant)) => {
                tracing::debug!(
                    "Participant joined: {} ({})",
                    participant.username,
                    participant.participant_id
                );
                self.roster.apply_join(participant);
                self.publish_roster();
            }
            (ConnectionState::Connected, InboundEvent::PresenceLeave { participant_id }) => {
                if self.roster.apply_leave(&participant_id).is_some() {
                    tracing::debug!("Participant left: {}", participant_id);
                    self.publish_roster();
                }
            }
            (
                ConnectionState::Connected,
                InboundEvent::Typing {
                    participant_id,
                    is_typing,
                },
            ) => {
                if self
                    .roster
                    .apply_typing(&participant_id, is_typing, Instant::now())
                {
                    self.publish_roster();
                }
            }
            (_, InboundEvent::Discard) => {}
            (state, event) => {
                tracing::debug!("Dropping unexpected event in state {}: {:?}", state, event);
            }
        }
    }

    // ========================================
    // Outbound
    // ========================================

    async fn send_frame(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let json = encode_outbound(frame).map_err(|e| TransportError::Send(e.to_string()))?;
        self.transport.send(json).await
    }

    /// Send a chat message.
    ///
    /// Returns `true` when the message reached the transport. Blank or
    /// oversized text and any state but `Connected` are rejected silently.
    pub async fn send_text(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty message");
            return false;
        }
        if text.chars().count() > self.config.max_message_len {
            tracing::debug!(
                "Ignoring message longer than {} characters",
                self.config.max_message_len
            );
            return false;
        }
        if self.state != ConnectionState::Connected {
            tracing::debug!("Ignoring send() in state {}", self.state);
            return false;
        }

        let frame = OutboundFrame::Message {
            text: text.to_string(),
        };
        if let Err(e) = self.send_frame(&frame).await {
            tracing::warn!("Failed to send message: {}", e);
            self.on_transport_lost(&e.to_string()).await;
            return false;
        }

        if self.config.local_echo {
            let sender_name = self
                .identity
                .as_ref()
                .map(|i| i.username.clone())
                .unwrap_or_default();
            self.log.append(Message {
                message_id: None,
                sender_id: self.self_id.clone(),
                sender_name,
                text: text.to_string(),
                timestamp: self.clock.now(),
                kind: MessageKind::Chat,
            });
            self.publish_log();
        }
        true
    }

    /// Send the local typing flag. Dropped unless `Connected`.
    pub async fn send_typing(&mut self, is_typing: bool) -> bool {
        if self.state != ConnectionState::Connected {
            tracing::debug!("Dropping typing({}) in state {}", is_typing, self.state);
            return false;
        }
        if let Err(e) = self.send_frame(&OutboundFrame::Typing { is_typing }).await {
            tracing::warn!("Failed to send typing indicator: {}", e);
            self.on_transport_lost(&e.to_string()).await;
            return false;
        }
        true
    }
}
