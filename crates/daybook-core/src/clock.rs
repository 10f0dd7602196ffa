//! Wall-clock access.
//!
//! Services never call `Local::now()` directly; they read time through a
//! [`Clock`] so sweeps, streaks and quiet hours can be driven
//! deterministically in tests.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::cell::Cell;

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// Start at a local wall-clock time.
    ///
    /// Falls back to the earliest valid instant when the wall time is
    /// ambiguous (DST fold) and to the epoch when it does not exist.
    pub fn at(local: NaiveDateTime) -> Self {
        Self::new(
            local_instant(local)
                .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&Local)),
        )
    }

    pub fn set(&self, now: DateTime<Local>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}

/// Resolve a local wall-clock time to an instant.
pub fn local_instant(local: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&local).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn manual_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let clock = ManualClock::at(start);
        clock.advance(Duration::days(1));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(clock.now().naive_local(), start + Duration::days(1));
    }
}
