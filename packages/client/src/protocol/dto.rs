//! Wire-level frames exchanged with the chat server.
//!
//! Every frame is a JSON object tagged by `"type"` with camelCase fields.
//! Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};

/// Frames sent by this client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    Join { username: String },
    Message { text: String },
    Typing { is_typing: bool },
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum InboundFrame {
    #[serde(rename = "join-ack")]
    JoinAck {
        participant_id: String,
        #[serde(default)]
        roster: Vec<ParticipantDto>,
        #[serde(default)]
        history: Vec<MessageDto>,
    },
    #[serde(rename = "message")]
    Message(MessageDto),
    #[serde(rename = "presence.join")]
    PresenceJoin(ParticipantDto),
    #[serde(rename = "presence.leave")]
    PresenceLeave { participant_id: String },
    #[serde(rename = "typing")]
    Typing {
        participant_id: String,
        is_typing: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub participant_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub text: String,
    /// Unix timestamp (milliseconds since epoch)
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKindDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKindDto {
    Chat,
    System,
}
