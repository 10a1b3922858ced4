//! Chat session facade.
//!
//! A [`ChatSession`] is what the surrounding application talks to. It owns a
//! single task that in turn owns the channel connection and the typing
//! debouncer; all mutation happens on that task, one event at a time. The
//! facade sends commands over a channel and waits for each one to be
//! applied, and exposes `watch` receivers as read-only observers.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::Instant,
};

use agora_shared::time::{Clock, SystemClock};

use crate::{
    config::ChatConfig,
    connection::ChannelConnection,
    domain::{
        ConnectionState, Identity, LogSnapshot, Message, Participant, TypingDebouncer,
        timer::sleep_until_deadline,
    },
    transport::Transport,
};

enum Command {
    Connect {
        identity: Identity,
        done: oneshot::Sender<()>,
    },
    Send {
        text: String,
        done: oneshot::Sender<bool>,
    },
    KeyActivity {
        done: oneshot::Sender<()>,
    },
    SetTyping {
        is_typing: bool,
        done: oneshot::Sender<()>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
}

/// Handle to one chat session.
///
/// Must be created inside a tokio runtime. Dropping the handle disconnects
/// and stops the session task.
pub struct ChatSession {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    roster: watch::Receiver<Vec<Participant>>,
    log: watch::Receiver<LogSnapshot>,
    task: JoinHandle<()>,
}

impl ChatSession {
    pub fn new<T: Transport>(transport: T, config: ChatConfig) -> Self {
        Self::with_clock(transport, config, Arc::new(SystemClock))
    }

    /// Like [`ChatSession::new`] with an explicit wall clock for message timestamps.
    pub fn with_clock<T: Transport>(
        transport: T,
        config: ChatConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let debouncer = TypingDebouncer::new(config.typing_stop_after);
        let connection = ChannelConnection::new(transport, config, clock);
        let state = connection.subscribe_state();
        let roster = connection.subscribe_roster();
        let log = connection.subscribe_log();

        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(session_loop(connection, debouncer, rx));

        Self {
            commands,
            state,
            roster,
            log,
            task,
        }
    }

    async fn request<R>(&self, command: impl FnOnce(oneshot::Sender<R>) -> Command) -> Option<R> {
        let (done, reply) = oneshot::channel();
        if self.commands.send(command(done)).is_err() {
            tracing::warn!("Chat session task is no longer running");
            return None;
        }
        reply.await.ok()
    }

    /// Start connecting as `identity`. No-op unless idle or closed.
    pub async fn connect(&self, identity: Identity) {
        self.request(|done| Command::Connect { identity, done })
            .await;
    }

    /// Send a chat message. Returns `false` when it was rejected.
    pub async fn send(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.request(|done| Command::Send { text, done })
            .await
            .unwrap_or(false)
    }

    /// Report local key activity to the typing debouncer.
    pub async fn key_activity(&self) {
        self.request(|done| Command::KeyActivity { done }).await;
    }

    /// `true` counts as key activity; `false` ends typing right away.
    pub async fn set_typing(&self, is_typing: bool) {
        self.request(|done| Command::SetTyping { is_typing, done })
            .await;
    }

    /// Close the session. When this returns, no timer or transport event
    /// will touch the state, roster or log until the next `connect`.
    pub async fn disconnect(&self) {
        self.request(|done| Command::Disconnect { done }).await;
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn roster(&self) -> watch::Receiver<Vec<Participant>> {
        self.roster.clone()
    }

    pub fn log(&self) -> watch::Receiver<LogSnapshot> {
        self.log.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn current_roster(&self) -> Vec<Participant> {
        self.roster.borrow().clone()
    }

    pub fn current_log(&self) -> Vec<Message> {
        self.log.borrow().messages.clone()
    }

    /// Disconnect and wait for the session task to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::error!("Chat session task failed: {}", e);
        }
    }
}

async fn emit_typing<T: Transport>(connection: &mut ChannelConnection<T>, signal: Option<bool>) {
    if let Some(is_typing) = signal {
        connection.send_typing(is_typing).await;
    }
}

async fn handle_command<T: Transport>(
    connection: &mut ChannelConnection<T>,
    debouncer: &mut TypingDebouncer,
    command: Command,
) {
    match command {
        Command::Connect { identity, done } => {
            connection.connect(identity).await;
            let _ = done.send(());
        }
        Command::Send { text, done } => {
            let accepted = connection.send_text(&text).await;
            let _ = done.send(accepted);
        }
        Command::KeyActivity { done } | Command::SetTyping {
            is_typing: true,
            done,
        } => {
            let signal = debouncer.on_activity(Instant::now());
            emit_typing(connection, signal).await;
            let _ = done.send(());
        }
        Command::SetTyping {
            is_typing: false,
            done,
        } => {
            let signal = debouncer.finish();
            emit_typing(connection, signal).await;
            let _ = done.send(());
        }
        Command::Disconnect { done } => {
            debouncer.stop();
            connection.disconnect().await;
            let _ = done.send(());
        }
    }
}

async fn session_loop<T: Transport>(
    mut connection: ChannelConnection<T>,
    mut debouncer: TypingDebouncer,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        let typing_deadline = debouncer.deadline();
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut connection, &mut debouncer, command).await,
                None => {
                    debouncer.stop();
                    connection.disconnect().await;
                    break;
                }
            },
            event = connection.next_event() => connection.handle(event).await,
            () = sleep_until_deadline(typing_deadline) => {
                let signal = debouncer.on_timer(Instant::now());
                emit_typing(&mut connection, signal).await;
            }
        }
    }
    tracing::debug!("Chat session task finished");
}
