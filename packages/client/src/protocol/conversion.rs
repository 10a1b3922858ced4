//! Conversion between wire frames and domain events.

use thiserror::Error;

use agora_shared::time::millis_to_datetime;

use crate::domain::{Message, MessageKind, Participant};

use super::dto::{InboundFrame, MessageDto, MessageKindDto, OutboundFrame, ParticipantDto};

/// A decoded inbound event. Anything that could not be decoded is `Discard`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    JoinAck {
        participant_id: String,
        roster: Vec<Participant>,
        history: Vec<Message>,
    },
    /// `sender_name` is empty when the server did not send one
    Message(Message),
    PresenceJoin(Participant),
    PresenceLeave {
        participant_id: String,
    },
    Typing {
        participant_id: String,
        is_typing: bool,
    },
    Discard,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("Participant id is empty")]
    EmptyParticipantId,
}

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<ParticipantDto> for Participant {
    type Error = ConversionError;

    fn try_from(dto: ParticipantDto) -> Result<Self, Self::Error> {
        if dto.participant_id.is_empty() {
            return Err(ConversionError::EmptyParticipantId);
        }
        Ok(Participant::new(dto.participant_id, dto.username))
    }
}

impl TryFrom<MessageDto> for Message {
    type Error = ConversionError;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        let timestamp = millis_to_datetime(dto.timestamp)
            .ok_or(ConversionError::TimestampOutOfRange(dto.timestamp))?;
        let kind = match dto.kind {
            Some(MessageKindDto::System) => MessageKind::System,
            Some(MessageKindDto::Chat) | None => MessageKind::Chat,
        };
        Ok(Self {
            message_id: dto.message_id,
            sender_id: dto.sender_id,
            sender_name: dto.sender_name.unwrap_or_default(),
            text: dto.text,
            timestamp,
            kind,
        })
    }
}

/// Convert a list, dropping (and logging) the items that fail.
fn convert_all<D, T>(items: Vec<D>, what: &str) -> Vec<T>
where
    T: TryFrom<D, Error = ConversionError>,
{
    items
        .into_iter()
        .filter_map(|item| match T::try_from(item) {
            Ok(converted) => Some(converted),
            Err(e) => {
                tracing::debug!("Skipping invalid {} entry: {}", what, e);
                None
            }
        })
        .collect()
}

impl From<InboundFrame> for InboundEvent {
    fn from(frame: InboundFrame) -> Self {
        let converted = match frame {
            InboundFrame::JoinAck {
                participant_id,
                roster,
                history,
            } => {
                if participant_id.is_empty() {
                    Err(ConversionError::EmptyParticipantId)
                } else {
                    Ok(InboundEvent::JoinAck {
                        participant_id,
                        roster: convert_all(roster, "roster"),
                        history: convert_all(history, "history"),
                    })
                }
            }
            InboundFrame::Message(dto) => Message::try_from(dto).map(InboundEvent::Message),
            InboundFrame::PresenceJoin(dto) => {
                Participant::try_from(dto).map(InboundEvent::PresenceJoin)
            }
            InboundFrame::PresenceLeave { participant_id } => {
                Ok(InboundEvent::PresenceLeave { participant_id })
            }
            InboundFrame::Typing {
                participant_id,
                is_typing,
            } => Ok(InboundEvent::Typing {
                participant_id,
                is_typing,
            }),
        };

        converted.unwrap_or_else(|e| {
            tracing::debug!("Discarding inbound frame: {}", e);
            InboundEvent::Discard
        })
    }
}

/// Decode one text frame. Malformed or unknown frames become `Discard`.
pub fn parse_inbound(text: &str) -> InboundEvent {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame.into(),
        Err(e) => {
            tracing::debug!("Discarding undecodable frame ({}): {}", e, text);
            InboundEvent::Discard
        }
    }
}

/// Encode one outbound frame as JSON text.
pub fn encode_outbound(frame: &OutboundFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_ack() {
        // テスト項目: join-ack が名簿と履歴付きで変換される
        // given (前提条件):
        let text = r#"{
            "type": "join-ack",
            "participantId": "p1",
            "roster": [{"participantId": "p1", "username": "alice"}],
            "history": [{"messageId": "m1", "senderId": "p2", "senderName": "bob", "text": "yo", "timestamp": 1672531200000}]
        }"#;

        // when (操作):
        let event = parse_inbound(text);

        // then (期待する結果):
        let InboundEvent::JoinAck {
            participant_id,
            roster,
            history,
        } = event
        else {
            panic!("expected JoinAck");
        };
        assert_eq!(participant_id, "p1");
        assert_eq!(roster, vec![Participant::new("p1", "alice")]);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender_name, "bob");
        assert_eq!(history[0].kind, MessageKind::Chat);
        assert_eq!(history[0].timestamp.timestamp_millis(), 1672531200000);
    }

    #[test]
    fn test_parse_message_without_sender_name() {
        // テスト項目: senderName のないメッセージは空の送信者名で変換される
        // given (前提条件):
        let text = r#"{"type":"message","messageId":"m1","senderId":"p2","text":"hi","timestamp":1000}"#;

        // when (操作):
        let event = parse_inbound(text);

        // then (期待する結果):
        let InboundEvent::Message(message) = event else {
            panic!("expected Message");
        };
        assert_eq!(message.sender_id.as_deref(), Some("p2"));
        assert_eq!(message.sender_name, "");
        assert_eq!(message.text, "hi");
    }

    #[test]
    fn test_parse_presence_and_typing() {
        // テスト項目: presence.join / presence.leave / typing が変換される
        // given (前提条件):
        let join = r#"{"type":"presence.join","participantId":"p2","username":"bob"}"#;
        let leave = r#"{"type":"presence.leave","participantId":"p2"}"#;
        let typing = r#"{"type":"typing","participantId":"p2","isTyping":true}"#;

        // when (操作):
        let events = [parse_inbound(join), parse_inbound(leave), parse_inbound(typing)];

        // then (期待する結果):
        assert_eq!(
            events,
            [
                InboundEvent::PresenceJoin(Participant::new("p2", "bob")),
                InboundEvent::PresenceLeave {
                    participant_id: "p2".to_string()
                },
                InboundEvent::Typing {
                    participant_id: "p2".to_string(),
                    is_typing: true
                },
            ]
        );
    }

    #[test]
    fn test_parse_malformed_frames_are_discarded() {
        // テスト項目: 不正な JSON・未知の type・欠落フィールドは Discard になる
        // given (前提条件):
        let frames = [
            "not json",
            r#"{"type":"reaction","emoji":"+1"}"#,
            r#"{"type":"typing","participantId":"p2"}"#,
            r#"{"type":"message","text":"hi","timestamp":9223372036854775807}"#,
            r#"{"type":"presence.join","participantId":"","username":"nobody"}"#,
        ];

        // when (操作):
        let events: Vec<InboundEvent> = frames.iter().map(|f| parse_inbound(f)).collect();

        // then (期待する結果):
        assert!(events.iter().all(|e| *e == InboundEvent::Discard));
    }

    #[test]
    fn test_join_ack_skips_invalid_entries() {
        // テスト項目: join-ack 内の不正な要素だけが取り除かれる
        // given (前提条件):
        let text = r#"{
            "type": "join-ack",
            "participantId": "p1",
            "roster": [{"participantId": "", "username": "ghost"}, {"participantId": "p1", "username": "alice"}],
            "history": [{"text": "bad", "timestamp": -9223372036854775808}, {"text": "ok", "timestamp": 5, "kind": "system"}]
        }"#;

        // when (操作):
        let event = parse_inbound(text);

        // then (期待する結果):
        let InboundEvent::JoinAck {
            roster, history, ..
        } = event
        else {
            panic!("expected JoinAck");
        };
        assert_eq!(roster.len(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, MessageKind::System);
    }

    #[test]
    fn test_encode_outbound_frames() {
        // テスト項目: 送信フレームが type タグ付きの camelCase JSON になる
        // given (前提条件):
        let frames = [
            OutboundFrame::Join {
                username: "alice".to_string(),
            },
            OutboundFrame::Message {
                text: "hello".to_string(),
            },
            OutboundFrame::Typing { is_typing: true },
        ];

        // when (操作):
        let encoded: Vec<String> = frames
            .iter()
            .map(|f| encode_outbound(f).unwrap())
            .collect();

        // then (期待する結果):
        assert_eq!(
            encoded,
            vec![
                r#"{"type":"join","username":"alice"}"#,
                r#"{"type":"message","text":"hello"}"#,
                r#"{"type":"typing","isTyping":true}"#,
            ]
        );
    }
}
