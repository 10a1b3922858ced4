//! Ordered, append-only message log.
//!
//! Order is arrival order on the channel; timestamps are never used to sort.

use std::collections::HashSet;

use super::model::Message;

/// Copy of the log handed to observers.
///
/// `epoch` is bumped every time the history is replaced, so a renderer can
/// tell a replacement from appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSnapshot {
    pub epoch: u64,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    epoch: u64,
    dedupe: bool,
    seen_ids: HashSet<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that drops messages whose `message_id` it has already stored.
    pub fn with_dedupe() -> Self {
        Self {
            dedupe: true,
            ..Self::default()
        }
    }

    /// Replace the whole content with a history replay. Not a merge.
    pub fn replace_history(&mut self, history: Vec<Message>) {
        self.messages.clear();
        self.seen_ids.clear();
        self.epoch += 1;
        for message in history {
            self.append(message);
        }
    }

    /// Append at the end regardless of timestamp.
    ///
    /// Returns `false` only when de-duplication is enabled and the message id
    /// is already present.
    pub fn append(&mut self, message: Message) -> bool {
        if self.dedupe
            && let Some(id) = &message.message_id
            && !self.seen_ids.insert(id.clone())
        {
            tracing::debug!("Dropping duplicate message '{}'", id);
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            epoch: self.epoch,
            messages: self.messages.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::model::MessageKind;

    fn message(id: Option<&str>, text: &str, millis: i64) -> Message {
        Message {
            message_id: id.map(str::to_string),
            sender_id: Some("p1".to_string()),
            sender_name: "alice".to_string(),
            text: text.to_string(),
            timestamp: DateTime::<Utc>::from_timestamp_millis(millis).unwrap(),
            kind: MessageKind::Chat,
        }
    }

    fn texts(log: &MessageLog) -> Vec<&str> {
        log.all().iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_append_keeps_arrival_order() {
        // テスト項目: タイムスタンプが逆順でも到着順に並ぶ
        // given (前提条件):
        let mut log = MessageLog::new();

        // when (操作):
        log.append(message(Some("m1"), "later", 2000));
        log.append(message(Some("m2"), "earlier", 1000));

        // then (期待する結果):
        assert_eq!(texts(&log), vec!["later", "earlier"]);
    }

    #[test]
    fn test_replace_history_is_not_a_merge() {
        // テスト項目: 履歴の置き換えは既存内容を全て置き換える
        // given (前提条件):
        let mut log = MessageLog::new();
        log.append(message(Some("m1"), "old", 1000));

        // when (操作):
        log.replace_history(vec![
            message(Some("h1"), "first", 10),
            message(Some("h2"), "second", 20),
        ]);

        // then (期待する結果):
        assert_eq!(texts(&log), vec!["first", "second"]);
        assert_eq!(log.epoch(), 1);
    }

    #[test]
    fn test_duplicates_kept_by_default() {
        // テスト項目: デフォルトでは同じ message_id の重複を除去しない
        // given (前提条件):
        let mut log = MessageLog::new();
        log.append(message(Some("m1"), "hi", 1000));

        // when (操作):
        let appended = log.append(message(Some("m1"), "hi", 1000));

        // then (期待する結果):
        assert!(appended);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_dedupe_drops_redelivered_message() {
        // テスト項目: 重複除去が有効な場合、再配送されたメッセージは追加されない
        // given (前提条件):
        let mut log = MessageLog::with_dedupe();
        log.replace_history(vec![message(Some("m1"), "hi", 1000)]);

        // when (操作):
        let redelivered = log.append(message(Some("m1"), "hi", 1000));
        let fresh = log.append(message(Some("m2"), "new", 2000));

        // then (期待する結果):
        assert!(!redelivered);
        assert!(fresh);
        assert_eq!(texts(&log), vec!["hi", "new"]);
    }

    #[test]
    fn test_dedupe_never_drops_entries_without_id() {
        // テスト項目: ID のない楽観的エントリは重複除去の対象外
        // given (前提条件):
        let mut log = MessageLog::with_dedupe();

        // when (操作):
        log.append(message(None, "same", 1000));
        log.append(message(None, "same", 1000));

        // then (期待する結果):
        assert_eq!(log.len(), 2);
    }
}
