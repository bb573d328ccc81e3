//! Test clock: deterministic `Clock` implementation for tests.

use chrono::{DateTime, Utc};
use storyplayer_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 2026-01-15T10:00:00Z, the timestamp used across tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(1_768_471_200_000_000_000)
}
