//! Cancellable repeating sweep timers.
//!
//! A [`SweepTimer`] does not own a thread or a task. The caller polls it with
//! the current time (from a [`Clock`](crate::clock::Clock)) and runs the sweep
//! when it reports due, so timers can be driven from a tokio interval or
//! stepped by hand in tests.

use chrono::{DateTime, Duration, Local};

/// Longest period accepted from configuration.
const MAX_PERIOD_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepTimer {
    name: &'static str,
    period: Duration,
    next_due: Option<DateTime<Local>>,
}

impl SweepTimer {
    /// A running timer whose first sweep is one `period` after `now`.
    pub fn start(name: &'static str, period: Duration, now: DateTime<Local>) -> Self {
        Self {
            name,
            period,
            next_due: Some(now + period),
        }
    }

    /// A timer with a period given in seconds, clamped to between one second and a week.
    pub fn every_secs(name: &'static str, secs: u64, now: DateTime<Local>) -> Self {
        let secs = secs.clamp(1, MAX_PERIOD_SECS);
        Self::start(name, Duration::seconds(secs as i64), now)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Option<DateTime<Local>> {
        self.next_due
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Whether a sweep is due at `now`. A due timer re-arms one period after `now`,
    /// so missed periods collapse into a single sweep.
    pub fn poll(&mut self, now: DateTime<Local>) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Re-arm a timer, cancelled or not, one period after `now`.
    pub fn restart(&mut self, now: DateTime<Local>) {
        self.next_due = Some(now + self.period);
    }
}
