//! Message formatting utilities for client display.

use agora_shared::time::to_clock_time;

use crate::domain::{ConnectionState, Message, MessageKind, Participant};

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the roster received when joining
    ///
    /// # Arguments
    ///
    /// * `participants` - Participants in roster order
    /// * `own_username` - The local user's name (to mark as "me")
    pub fn format_roster(participants: &[Participant], own_username: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nParticipants:\n", RULE));

        if participants.is_empty() {
            output.push_str("(No participants)\n");
        } else {
            for participant in participants {
                let me_suffix = if participant.username == own_username {
                    " (me)"
                } else {
                    ""
                };
                output.push_str(&format!("{}{}\n", participant.username, me_suffix));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format the header printed before a history replay
    pub fn format_history_header(count: usize) -> String {
        match count {
            0 => "\n(No earlier messages)\n".to_string(),
            1 => "\n--- 1 earlier message ---\n".to_string(),
            n => format!("\n--- {} earlier messages ---\n", n),
        }
    }

    /// Format one log entry
    pub fn format_message(message: &Message, own_username: &str) -> String {
        let time = to_clock_time(&message.timestamp);
        match message.kind {
            MessageKind::System => format!("\n[{}] * {}\n", time, message.text),
            MessageKind::Chat => {
                let me_suffix = if message.sender_name == own_username {
                    " (me)"
                } else {
                    ""
                };
                format!(
                    "\n[{}] @{}{}: {}\n",
                    time, message.sender_name, me_suffix, message.text
                )
            }
        }
    }

    /// Format a participant-joined notification
    pub fn format_participant_joined(username: &str) -> String {
        format!("\n+ {} joined\n", username)
    }

    /// Format a participant-left notification
    pub fn format_participant_left(username: &str) -> String {
        format!("\n- {} left\n", username)
    }

    /// Format the typing indicator line; empty when nobody is typing
    pub fn format_typing(usernames: &[&str]) -> String {
        match usernames {
            [] => String::new(),
            [one] => format!("\n({} is typing...)\n", one),
            [first, second] => format!("\n({} and {} are typing...)\n", first, second),
            [first, rest @ ..] => format!(
                "\n({} and {} others are typing...)\n",
                first,
                rest.len()
            ),
        }
    }

    /// Format a connection state change
    pub fn format_state(state: ConnectionState) -> String {
        format!("\n[{}]\n", state)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn timestamp() -> DateTime<Utc> {
        // 2023-01-01 09:30:15 UTC
        DateTime::<Utc>::from_timestamp_millis(1672565415000).unwrap()
    }

    #[test]
    fn test_format_roster_with_empty_participants() {
        // テスト項目: 参加者が空の場合、適切なメッセージが表示される
        // given (前提条件):
        let participants = vec![];

        // when (操作):
        let result = MessageFormatter::format_roster(&participants, "alice");

        // then (期待する結果):
        assert!(result.contains("Participants:"));
        assert!(result.contains("(No participants)"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_roster_marks_me() {
        // テスト項目: 複数参加者の場合、全員が表示され自分にはマークが付く
        // given (前提条件):
        let participants = vec![Participant::new("p1", "alice"), Participant::new("p2", "bob")];

        // when (操作):
        let result = MessageFormatter::format_roster(&participants, "alice");

        // then (期待する結果):
        assert!(result.contains("alice (me)"));
        assert!(result.contains("bob\n"));
        assert!(!result.contains("bob (me)"));
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: チャットメッセージが時刻と送信者付きでフォーマットされる
        // given (前提条件):
        let message = Message {
            message_id: Some("m1".to_string()),
            sender_id: Some("p2".to_string()),
            sender_name: "bob".to_string(),
            text: "Hello, world!".to_string(),
            timestamp: timestamp(),
            kind: MessageKind::Chat,
        };

        // when (操作):
        let result = MessageFormatter::format_message(&message, "alice");

        // then (期待する結果):
        assert_eq!(result, "\n[09:30:15] @bob: Hello, world!\n");
    }

    #[test]
    fn test_format_system_message() {
        // テスト項目: システムメッセージは送信者名なしでフォーマットされる
        // given (前提条件):
        let message = Message::system("Disconnected", timestamp());

        // when (操作):
        let result = MessageFormatter::format_message(&message, "alice");

        // then (期待する結果):
        assert_eq!(result, "\n[09:30:15] * Disconnected\n");
    }

    #[test]
    fn test_format_history_header() {
        // テスト項目: 履歴件数に応じた見出しが出る
        // given (前提条件):
        let counts = [0, 1, 3];

        // when (操作):
        let headers: Vec<String> = counts
            .iter()
            .map(|&n| MessageFormatter::format_history_header(n))
            .collect();

        // then (期待する結果):
        assert!(headers[0].contains("No earlier messages"));
        assert!(headers[1].contains("1 earlier message "));
        assert!(headers[2].contains("3 earlier messages"));
    }

    #[test]
    fn test_format_typing() {
        // テスト項目: 入力中の人数に応じた表示になる
        // given (前提条件):
        let none: [&str; 0] = [];

        // when (操作):
        let results = [
            MessageFormatter::format_typing(&none),
            MessageFormatter::format_typing(&["bob"]),
            MessageFormatter::format_typing(&["bob", "carol"]),
            MessageFormatter::format_typing(&["bob", "carol", "dave"]),
        ];

        // then (期待する結果):
        assert_eq!(results[0], "");
        assert!(results[1].contains("bob is typing"));
        assert!(results[2].contains("bob and carol are typing"));
        assert!(results[3].contains("bob and 2 others are typing"));
    }

    #[test]
    fn test_format_presence_and_state() {
        // テスト項目: 参加・退出・接続状態の通知がフォーマットされる
        // given (前提条件):
        let username = "charlie";

        // when (操作):
        let joined = MessageFormatter::format_participant_joined(username);
        let left = MessageFormatter::format_participant_left(username);
        let state = MessageFormatter::format_state(ConnectionState::Reconnecting);

        // then (期待する結果):
        assert!(joined.contains("+ charlie joined"));
        assert!(left.contains("- charlie left"));
        assert!(state.contains("[reconnecting]"));
    }
}
