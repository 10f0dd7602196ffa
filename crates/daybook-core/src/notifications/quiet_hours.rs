//! Quiet hours: a daily local-time window in which OS popups and sounds
//! are suppressed. Notifications are still recorded.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::hhmm;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHours {
    pub enabled: bool,
    /// Inclusive start, `HH:MM`.
    pub start: String,
    /// Inclusive end, `HH:MM`. Earlier than `start` means the window wraps midnight.
    pub end: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".into(),
            end: "08:00".into(),
        }
    }
}

impl QuietHours {
    /// Whether popups and sounds are suppressed at local time `now`.
    pub fn is_active(&self, now: NaiveTime) -> bool {
        self.enabled && self.covers(now)
    }

    /// The window test alone, at minute resolution, regardless of `enabled`.
    pub fn covers(&self, now: NaiveTime) -> bool {
        let (Some(start), Some(end)) = (hhmm::parse(&self.start), hhmm::parse(&self.end)) else {
            warn!(start = %self.start, end = %self.end, "ignoring malformed quiet hours");
            return false;
        };
        let t = now.hour() * 60 + now.minute();
        let start = start.hour() * 60 + start.minute();
        let end = end.hour() * 60 + end.minute();

        if start <= end {
            start <= t && t <= end
        } else {
            t >= start || t <= end
        }
    }
}
