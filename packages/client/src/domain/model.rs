//! Domain model of the messaging core.

use std::fmt;

use chrono::{DateTime, Utc};

/// Display name of the local user, supplied once at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// A remote (or local) member of the chat, keyed by the server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub participant_id: String,
    /// Display-only, not guaranteed unique
    pub username: String,
    pub is_typing: bool,
}

impl Participant {
    pub fn new(participant_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            username: username.into(),
            is_typing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    System,
}

/// An entry of the message log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Absent for optimistic local entries and system notices
    pub message_id: Option<String>,
    pub sender_id: Option<String>,
    pub sender_name: String,
    pub text: String,
    /// Display only; the log is ordered by arrival
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl Message {
    /// Sender name used for locally generated notices
    pub const SYSTEM_SENDER: &'static str = "system";

    pub fn system(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            message_id: None,
            sender_id: None,
            sender_name: Self::SYSTEM_SENDER.to_string(),
            text: text.into(),
            timestamp,
            kind: MessageKind::System,
        }
    }
}

/// Lifecycle state of the channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    /// `true` for the states a local `disconnect()` moves out of
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}
