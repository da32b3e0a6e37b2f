//! Wall clock abstraction.
//!
//! Cache entries carry a wall-clock `fetched_at` timestamp, and both freshness classification
//! and store expiry are computed from the same [`Clock`]. Production code uses
//! [`SystemClock`]; tests drive time explicitly with [`ManualClock`].

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use std::time::Duration;

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(start) }
    }

    /// Creates a clock frozen at the current system time.
    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write() = at;
    }

    /// Moves the clock forward, saturating at the maximum representable time.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now = now.checked_add_signed(to_time_delta(by)).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_now()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Converts a std duration into a chrono delta, saturating on overflow.
#[must_use]
pub fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
