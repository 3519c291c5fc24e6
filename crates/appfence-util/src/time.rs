//! Time utilities for appfence
//!
//! Enforcement arithmetic (session elapsed time, cooldown countdowns, the
//! deferred block deadline) runs on monotonic time, immune to wall-clock
//! changes. Wall-clock time is used only for the daily ledger boundary and
//! the security session TTL.

use chrono::{DateTime, Local, NaiveDate};
use std::time::{Duration, Instant};

/// Get the current local time.
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// The calendar day key for the usage ledger.
pub fn today_key() -> NaiveDate {
    now().date_naive()
}

/// Represents a point in monotonic time for countdown enforcement.
/// This is immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.duration_since(earlier.0)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}
