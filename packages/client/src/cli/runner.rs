//! Client execution logic.
//!
//! Reconnection lives in the session; this module only wires the terminal
//! to it. A blocking thread runs rustyline and forwards lines over a
//! channel, and a render task prints whatever the session observers report.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    config::ChatConfig,
    domain::{ConnectionState, Identity, LogSnapshot, MessageKind, Participant},
    error::ClientError,
    session::ChatSession,
    transport::WebSocketTransport,
};

use super::{formatter::MessageFormatter, ui::redisplay_prompt};

/// Run the interactive chat client until the user quits or the session closes
pub async fn run_client(url: String, username: String) -> Result<(), Box<dyn std::error::Error>> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(Box::new(ClientError::InvalidUsername));
    }

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let (ready_tx, ready_rx) = oneshot::channel();
    let prompt = format!("{}> ", username);
    std::thread::spawn(move || readline_loop(prompt, input_tx, ready_tx));
    ready_rx
        .await
        .unwrap_or_else(|_| Err("readline thread exited".to_string()))
        .map_err(ClientError::Readline)?;

    let transport = WebSocketTransport::new(url);
    tracing::info!("Connecting to {} as '{}'", transport.url(), username);
    let session = ChatSession::new(transport, ChatConfig::default());

    let render_task = tokio::spawn(render_loop(
        session.state(),
        session.roster(),
        session.log(),
        username.clone(),
    ));

    session.connect(Identity::new(username.clone())).await;
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. /who lists participants, /quit exits.\n",
        username
    );

    let mut state = session.state();
    let outcome = loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    // Ctrl+C / Ctrl+D
                    break Ok(());
                };
                match line.as_str() {
                    "/quit" => break Ok(()),
                    "/who" => {
                        print!("{}", MessageFormatter::format_roster(&session.current_roster(), &username));
                        redisplay_prompt(&username);
                    }
                    _ => {
                        session.key_activity().await;
                        let sent = session.send(line).await;
                        session.set_typing(false).await;
                        if !sent {
                            println!("\n(not sent: {})", session.current_state());
                            redisplay_prompt(&username);
                        }
                    }
                }
            }
            closed = state.wait_for(|s| *s == ConnectionState::Closed) => {
                drop(closed);
                let reason = session
                    .current_log()
                    .iter()
                    .rev()
                    .find(|m| m.kind == MessageKind::System)
                    .map(|m| m.text.clone())
                    .unwrap_or_else(|| "connection closed".to_string());
                break Err(ClientError::SessionClosed(reason));
            }
        }
    };

    session.shutdown().await;
    render_task.abort();
    tracing::info!("Client session ended");

    outcome.map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
}

/// Blocking line reader; reports editor initialization through `ready`.
fn readline_loop(
    prompt: String,
    input_tx: mpsc::UnboundedSender<String>,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    loop {
        match editor.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    editor.add_history_entry(line).ok();
                    if input_tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                tracing::info!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                tracing::info!("EOF");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {}", err);
                break;
            }
        }
    }
}

/// Prints state changes, presence changes and new log entries.
async fn render_loop(
    mut state: watch::Receiver<ConnectionState>,
    mut roster: watch::Receiver<Vec<Participant>>,
    mut log: watch::Receiver<LogSnapshot>,
    username: String,
) {
    let mut view = RenderView::default();

    loop {
        let output = tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                MessageFormatter::format_state(current)
            }
            changed = roster.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = roster.borrow_and_update().clone();
                view.roster_update(current, &username)
            }
            changed = log.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = log.borrow_and_update().clone();
                view.log_update(&snapshot, &username)
            }
        };

        if !output.is_empty() {
            print!("{}", output);
            redisplay_prompt(&username);
        }
    }
}

/// What the terminal has already shown.
#[derive(Default)]
struct RenderView {
    roster: Vec<Participant>,
    typing: Vec<String>,
    epoch: u64,
    printed: usize,
}

impl RenderView {
    fn roster_update(&mut self, current: Vec<Participant>, username: &str) -> String {
        let mut output = String::new();

        if self.roster.is_empty() && !current.is_empty() {
            output.push_str(&MessageFormatter::format_roster(&current, username));
        } else {
            for joined in current
                .iter()
                .filter(|p| !self.roster.iter().any(|q| q.participant_id == p.participant_id))
            {
                output.push_str(&MessageFormatter::format_participant_joined(&joined.username));
            }
            for left in self
                .roster
                .iter()
                .filter(|p| !current.iter().any(|q| q.participant_id == p.participant_id))
            {
                output.push_str(&MessageFormatter::format_participant_left(&left.username));
            }
        }

        let typing: Vec<String> = current
            .iter()
            .filter(|p| p.is_typing && p.username != username)
            .map(|p| p.username.clone())
            .collect();
        if typing != self.typing {
            let names: Vec<&str> = typing.iter().map(String::as_str).collect();
            output.push_str(&MessageFormatter::format_typing(&names));
            self.typing = typing;
        }

        self.roster = current;
        output
    }

    fn log_update(&mut self, snapshot: &LogSnapshot, username: &str) -> String {
        let mut output = String::new();

        if snapshot.epoch != self.epoch {
            self.epoch = snapshot.epoch;
            self.printed = 0;
            output.push_str(&MessageFormatter::format_history_header(
                snapshot.messages.len(),
            ));
        }

        for message in snapshot.messages.iter().skip(self.printed) {
            output.push_str(&MessageFormatter::format_message(message, username));
        }
        self.printed = snapshot.messages.len();
        output
    }
}
