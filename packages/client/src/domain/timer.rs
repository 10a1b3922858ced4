//! Cancellable one-shot timer handle.
//!
//! A `Timer` only records a deadline; the session event loop sleeps until
//! the earliest armed deadline and asks the owner to fire it. Cancelling is
//! clearing the deadline, so a cancelled timer can never fire late.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// Arm (or re-arm) the timer to fire `delay` after `now`
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return `true` if the deadline has passed at `now`.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
///
/// Used as a `tokio::select!` branch; recreated on every loop iteration.
pub async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_if_due_before_deadline() {
        // テスト項目: 期限前は発火せず、タイマーは保持される
        // given (前提条件):
        let now = Instant::now();
        let mut timer = Timer::default();
        timer.arm(now, Duration::from_millis(1000));

        // when (操作):
        let fired = timer.fire_if_due(now + Duration::from_millis(999));

        // then (期待する結果):
        assert!(!fired);
        assert!(timer.is_armed());
    }

    #[test]
    fn test_fire_if_due_at_deadline_disarms() {
        // テスト項目: 期限到達で一度だけ発火し、解除される
        // given (前提条件):
        let now = Instant::now();
        let mut timer = Timer::default();
        timer.arm(now, Duration::from_millis(1000));

        // when (操作):
        let first = timer.fire_if_due(now + Duration::from_millis(1000));
        let second = timer.fire_if_due(now + Duration::from_millis(5000));

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        // テスト項目: キャンセルされたタイマーは期限後も発火しない
        // given (前提条件):
        let now = Instant::now();
        let mut timer = Timer::default();
        timer.arm(now, Duration::from_millis(10));

        // when (操作):
        timer.cancel();
        let fired = timer.fire_if_due(now + Duration::from_secs(60));

        // then (期待する結果):
        assert!(!fired);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        // テスト項目: 再設定すると期限が置き換わる
        // given (前提条件):
        let now = Instant::now();
        let mut timer = Timer::default();
        timer.arm(now, Duration::from_millis(1000));

        // when (操作):
        timer.arm(now + Duration::from_millis(400), Duration::from_millis(1000));

        // then (期待する結果):
        assert_eq!(timer.deadline(), Some(now + Duration::from_millis(1400)));
    }
}
