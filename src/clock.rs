//! Wall-clock abstraction.
//!
//! The scanner compares UTC timestamps for idle detection, while quiet hours
//! are evaluated against local wall-clock time. Both come from a [`Clock`] so
//! timing logic can be driven from tests.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current local wall-clock time.
    fn now_local(&self) -> NaiveDateTime;
}

/// System time, local time zone from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock anchored to tokio's timer.
///
/// Time starts at `base` and moves forward with `tokio::time` (so a paused
/// runtime auto-advancing through a sleep also advances this clock) plus any
/// explicit [`advance`](Self::advance) calls.
#[derive(Debug)]
pub struct ManualClock {
    base: DateTime<Utc>,
    offset: FixedOffset,
    anchor: tokio::time::Instant,
    skew: Mutex<chrono::Duration>,
}

impl ManualClock {
    /// Start at `base`, reporting local time in the given fixed offset.
    pub fn new(base: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            base,
            offset,
            anchor: tokio::time::Instant::now(),
            skew: Mutex::new(chrono::Duration::zero()),
        }
    }

    /// Start at the given local wall-clock time in UTC+0.
    pub fn at_local(local: NaiveDateTime) -> Self {
        Self::new(local.and_utc(), Utc.fix())
    }

    /// Jump forward without waiting on the timer.
    pub fn advance(&self, by: chrono::Duration) {
        let mut skew = self.skew.lock().unwrap_or_else(|e| e.into_inner());
        *skew += by;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor.elapsed()).unwrap_or_default();
        let skew = *self.skew.lock().unwrap_or_else(|e| e.into_inner());
        self.base + elapsed + skew
    }

    fn now_local(&self) -> NaiveDateTime {
        self.now_utc().with_timezone(&self.offset).naive_local()
    }
}
