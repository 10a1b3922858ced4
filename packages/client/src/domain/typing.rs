//! Typing indicator debounce.
//!
//! Turns a stream of local key-activity signals into discrete
//! `typing(true)` / `typing(false)` signals. Every method takes the current
//! instant explicitly and returns the signal to emit, if any; the session
//! loop owns the actual sleeping.

use std::time::Duration;

use tokio::time::Instant;

use super::timer::Timer;

/// Quiet period after which `typing(false)` is emitted
pub const DEFAULT_TYPING_STOP_AFTER: Duration = Duration::from_millis(1000);

#[derive(Debug)]
pub struct TypingDebouncer {
    stop_after: Duration,
    timer: Timer,
    typing: bool,
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_STOP_AFTER)
    }
}

impl TypingDebouncer {
    pub fn new(stop_after: Duration) -> Self {
        Self {
            stop_after,
            timer: Timer::default(),
            typing: false,
        }
    }

    /// Register key activity.
    ///
    /// Returns `Some(true)` on the first activity after being idle; later
    /// activity only pushes the stop deadline back.
    pub fn on_activity(&mut self, now: Instant) -> Option<bool> {
        self.timer.arm(now, self.stop_after);
        if self.typing {
            None
        } else {
            self.typing = true;
            Some(true)
        }
    }

    /// Fire the stop timer if it is due. Returns `Some(false)` when it fired.
    pub fn on_timer(&mut self, now: Instant) -> Option<bool> {
        if self.timer.fire_if_due(now) {
            self.typing = false;
            Some(false)
        } else {
            None
        }
    }

    /// Explicit "stopped typing" from the UI: cancels the timer and returns
    /// `Some(false)` if a `typing(true)` is outstanding.
    pub fn finish(&mut self) -> Option<bool> {
        self.timer.cancel();
        if self.typing {
            self.typing = false;
            Some(false)
        } else {
            None
        }
    }

    /// Cancel any pending timer without emitting anything.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.typing = false;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_activity_emits_typing_true() {
        // テスト項目: アイドル状態からの最初の入力で typing(true) が即座に出る
        // given (前提条件):
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::default();

        // when (操作):
        let signal = debouncer.on_activity(t0);

        // then (期待する結果):
        assert_eq!(signal, Some(true));
        assert_eq!(debouncer.deadline(), Some(t0 + ms(1000)));
    }

    #[test]
    fn test_burst_is_debounced_until_pause() {
        // テスト項目: 0, 200, 400ms の入力で typing(true) は 1 回、typing(false) は 1400ms に出る
        // given (前提条件):
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::default();

        // when (操作):
        let signals = [
            debouncer.on_activity(t0),
            debouncer.on_activity(t0 + ms(200)),
            debouncer.on_activity(t0 + ms(400)),
        ];
        let early = debouncer.on_timer(t0 + ms(1399));
        let due = debouncer.on_timer(t0 + ms(1400));

        // then (期待する結果):
        assert_eq!(signals, [Some(true), None, None]);
        assert_eq!(early, None);
        assert_eq!(due, Some(false));
        assert!(!debouncer.is_typing());
    }

    #[test]
    fn test_continuous_activity_never_stops() {
        // テスト項目: 1000ms 未満の間隔で入力が続く限り typing(false) は出ない
        // given (前提条件):
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::default();
        let mut emitted = Vec::new();

        // when (操作):
        for step in 0..50u64 {
            let now = t0 + ms(step * 900);
            emitted.extend(debouncer.on_timer(now));
            emitted.extend(debouncer.on_activity(now));
        }

        // then (期待する結果):
        assert_eq!(emitted, vec![true]);
    }

    #[test]
    fn test_activity_after_stop_starts_again() {
        // テスト項目: typing(false) の後の入力で再び typing(true) が出る
        // given (前提条件):
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::default();
        debouncer.on_activity(t0);
        debouncer.on_timer(t0 + ms(1000));

        // when (操作):
        let signal = debouncer.on_activity(t0 + ms(3000));

        // then (期待する結果):
        assert_eq!(signal, Some(true));
    }

    #[test]
    fn test_stop_cancels_without_emitting() {
        // テスト項目: stop() は typing(false) を出さずにタイマーを取り消す
        // given (前提条件):
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::default();
        debouncer.on_activity(t0);

        // when (操作):
        debouncer.stop();
        let after = debouncer.on_timer(t0 + ms(5000));

        // then (期待する結果):
        assert_eq!(after, None);
        assert_eq!(debouncer.deadline(), None);
        assert!(!debouncer.is_typing());
    }

    #[test]
    fn test_finish_emits_false_only_when_typing() {
        // テスト項目: finish() は typing 中のみ typing(false) を返す
        // given (前提条件):
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::default();

        // when (操作):
        let idle = debouncer.finish();
        debouncer.on_activity(t0);
        let typing = debouncer.finish();

        // then (期待する結果):
        assert_eq!(idle, None);
        assert_eq!(typing, Some(false));
        assert_eq!(debouncer.deadline(), None);
    }
}
