//! Reconnection backoff policy.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::time::Duration;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Exponential backoff without jitter: `min(base * 2^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl Backoff {
    /// Delay to wait before reconnect attempt number `attempt` (0-indexed).
    ///
    /// Total over `u32`; anything that would overflow saturates at `max_delay`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts, `None` for unlimited
///
/// # Returns
///
/// `true` if reconnection should be attempted, `false` otherwise
pub fn should_attempt_reconnect(current_attempt: u32, max_attempts: Option<u32>) -> bool {
    max_attempts.is_none_or(|max| current_attempt < max)
}
