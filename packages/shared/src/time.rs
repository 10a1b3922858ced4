//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock from a Unix timestamp in milliseconds.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn from_millis(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: millis_to_datetime(fixed_time_millis).unwrap_or_default(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.fixed_time
    }
}

/// Convert a Unix timestamp (milliseconds) into a UTC datetime.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn millis_to_datetime(timestamp_millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(timestamp_millis)
}

/// Format a datetime as a short `HH:MM:SS` clock time for display
pub fn to_clock_time(datetime: &DateTime<Utc>) -> String {
    datetime.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_increasing_timestamps() {
        // テスト項目: SystemClock が呼び出すたびに増加する時刻を返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = clock.now();

        // then (期待する結果):
        assert!(second >= first);
    }

    #[test]
    fn test_fixed_clock_returns_fixed_time() {
        // テスト項目: FixedClock が固定された時刻を返す
        // given (前提条件):
        let clock = FixedClock::from_millis(1672531200000);

        // when (操作):
        let first = clock.now();
        let second = clock.now();

        // then (期待する結果):
        assert_eq!(first.timestamp_millis(), 1672531200000);
        assert_eq!(first, second);
    }

    #[test]
    fn test_millis_to_datetime_out_of_range() {
        // テスト項目: 範囲外のタイムスタンプは None になる
        // given (前提条件):
        let timestamp = i64::MAX;

        // when (操作):
        let result = millis_to_datetime(timestamp);

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_to_clock_time() {
        // テスト項目: 表示用の時刻が HH:MM:SS 形式になる
        // given (前提条件):
        let datetime = millis_to_datetime(1672534805000).unwrap();

        // when (操作):
        let result = to_clock_time(&datetime);

        // then (期待する結果):
        assert_eq!(result, "01:00:05");
    }
}
