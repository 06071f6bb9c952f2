//! Daily quiet-hours window.
//!
//! Proactive messages that fall inside the window are deferred, not dropped:
//! the dispatcher sleeps until the window closes plus a random jitter of up to
//! one hour, so sessions detected overnight do not all fire at the same
//! instant.
//!
//! The window is half-open, `[start, end)`, in local wall-clock hours. When
//! `start > end` the window wraps past midnight (e.g. 22 → 6 covers
//! 22:00–05:59). When `start == end` there is no quiet window.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rand::Rng;
use std::time::Duration;

/// Upper bound (exclusive) of the post-window jitter, in seconds.
pub const MAX_JITTER_SECS: u64 = 3600;

/// Source of the random jitter draw.
pub trait JitterSource: Send + Sync {
    /// Draw a value in `[0, upper_exclusive)`.
    fn draw_secs(&self, upper_exclusive: u64) -> u64;
}

/// Uniform jitter from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn draw_secs(&self, upper_exclusive: u64) -> u64 {
        if upper_exclusive == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper_exclusive)
    }
}

/// Always returns the same draw, clamped into range.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub u64);

impl JitterSource for FixedJitter {
    fn draw_secs(&self, upper_exclusive: u64) -> u64 {
        self.0.min(upper_exclusive.saturating_sub(1))
    }
}

/// Quiet window expressed in local hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHoursPolicy {
    start_hour: u32,
    end_hour: u32,
}

impl QuietHoursPolicy {
    /// Build a policy; hours above 23 are clamped to 23.
    #[must_use]
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour: start_hour.min(23),
            end_hour: end_hour.min(23),
        }
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Whether `now` falls inside the window.
    #[must_use]
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let hour = now.hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    /// The instant the window containing `now` closes, or `None` outside it.
    ///
    /// Always strictly after `now`.
    #[must_use]
    pub fn wake_instant(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.contains(now) {
            return None;
        }
        let end = NaiveTime::from_hms_opt(self.end_hour, 0, 0)?;
        let mut wake = now.date().and_time(end);
        if wake <= now {
            wake += chrono::Duration::days(1);
        }
        Some(wake)
    }

    /// How long to defer a dispatch detected at `now`, drawing jitter from `jitter`.
    #[must_use]
    pub fn resolve_deferral(&self, now: NaiveDateTime, jitter: &dyn JitterSource) -> Option<Duration> {
        if !self.contains(now) {
            return None;
        }
        self.resolve_deferral_with_jitter(now, jitter.draw_secs(MAX_JITTER_SECS))
    }

    /// Deterministic variant of [`resolve_deferral`](Self::resolve_deferral).
    ///
    /// `jitter_secs` is clamped below [`MAX_JITTER_SECS`].
    #[must_use]
    pub fn resolve_deferral_with_jitter(
        &self,
        now: NaiveDateTime,
        jitter_secs: u64,
    ) -> Option<Duration> {
        let wake = self.wake_instant(now)?;
        let jitter = jitter_secs.min(MAX_JITTER_SECS - 1);
        let target = wake + chrono::Duration::seconds(i64::try_from(jitter).ok()?);
        (target - now).to_std().ok().filter(|d| !d.is_zero())
    }
}
