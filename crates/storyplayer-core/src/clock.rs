//! Wall-clock time for session stamps and gain ramps.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time. Tests substitute a fixed clock.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns `(now, now + length)`. Lengths beyond chrono's range saturate
    /// to the maximum delta.
    fn window(&self, length: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.now();
        let delta = TimeDelta::from_std(length).unwrap_or(TimeDelta::MAX);
        (start, start.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

/// Production clock reading the system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_window_spans_length_from_now() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let (from, to) = Frozen(start).window(Duration::from_millis(330));

        assert_eq!(from, start);
        assert_eq!((to - from).num_milliseconds(), 330);
    }

    #[test]
    fn test_window_saturates_huge_lengths() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let (_, to) = Frozen(start).window(Duration::MAX);

        assert_eq!(to, DateTime::<Utc>::MAX_UTC);
    }
}
