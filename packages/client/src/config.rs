//! Tunables of the messaging core.

use std::time::Duration;

use crate::domain::{Backoff, typing::DEFAULT_TYPING_STOP_AFTER};

const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Reconnect delay policy
    pub backoff: Backoff,
    /// How long `Connecting` waits for the join acknowledgment
    pub join_timeout: Duration,
    /// Quiet period before the local `typing(false)` is sent
    pub typing_stop_after: Duration,
    /// Remote typing flags expire after this long without a refresh; `None` disables expiry
    pub typing_ttl: Option<Duration>,
    /// Give up after this many consecutive failed reconnects; `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
    /// Append sent messages to the log without waiting for the server
    pub local_echo: bool,
    /// Drop inbound messages whose id is already in the log
    pub dedupe_messages: bool,
    /// Longest accepted outgoing message, in characters
    pub max_message_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            typing_stop_after: DEFAULT_TYPING_STOP_AFTER,
            typing_ttl: Some(DEFAULT_TYPING_TTL),
            max_reconnect_attempts: None,
            local_echo: true,
            dedupe_messages: false,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}
