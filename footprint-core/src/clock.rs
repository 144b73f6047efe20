//! Local wall-clock access.
//!
//! The ledger compares calendar days, not timestamps, so everything that
//! needs "today" goes through a [`Clock`]. Tests swap in a [`ManualClock`].

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, TimeDelta};
use std::sync::{Arc, RwLock};

/// Source of the current local date and time.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<NaiveDateTime>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    /// Creates a clock frozen at noon on `date`.
    pub fn at_noon(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now
            .read()
            .map(|guard| *guard)
            .unwrap_or_default()
    }
}

/// Time left until the next local midnight after `now`.
pub fn until_next_midnight(now: NaiveDateTime) -> std::time::Duration {
    let next = now
        .date()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0));

    next.map(|midnight| midnight - now)
        .and_then(|delta: TimeDelta| delta.to_std().ok())
        .unwrap_or(std::time::Duration::from_secs(24 * 60 * 60))
}
