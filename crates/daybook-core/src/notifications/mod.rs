//! Notification center.
//!
//! Notifications are kept most-recent-first, capped, persisted on every
//! change and fanned out to listeners. A notification created with
//! `scheduled_for` is visible immediately as a placeholder; the reminder
//! sweep later re-fires it as a fresh notification and marks the
//! placeholder read.
//!
//! ```text
//! add ──────────────────────────────> unread ─> read ─> removed
//! schedule_reminder ─> placeholder ─(sweep)─> fired copy (unread)
//!                           └─ marked read
//! ```

pub mod manager;
pub mod quiet_hours;
pub mod settings;
pub mod surface;

pub use manager::{ListenerId, NotificationManager};
pub use quiet_hours::QuietHours;
pub use settings::{NotificationSettings, SettingsPatch};
pub use surface::{
    LogSurface, NotificationSurface, NullSurface, OsNotification, Permission, PermissionFuture,
    RecordingSurface, SurfaceError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Notification {
    /// Whether this is a pending reminder placeholder that is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.read && self.scheduled_for.is_some_and(|at| at <= now)
    }
}

/// A notification before the manager assigns id, timestamp and read state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
    pub persistent: bool,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NewNotification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            action_url: None,
            action_label: None,
            persistent: false,
            scheduled_for: None,
        }
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn action_label(mut self, label: impl Into<String>) -> Self {
        self.action_label = Some(label.into());
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }
}

impl From<&Notification> for NewNotification {
    /// The live copy of a fired reminder: same content, no schedule.
    fn from(n: &Notification) -> Self {
        Self {
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind,
            action_url: n.action_url.clone(),
            action_label: n.action_label.clone(),
            persistent: n.persistent,
            scheduled_for: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn notification_json_shape() {
        let now = Utc::now();
        let n = Notification {
            id: "n1".into(),
            title: "Hi".into(),
            message: "There".into(),
            kind: NotificationKind::Reminder,
            timestamp: now,
            read: false,
            action_url: Some("/tasks".into()),
            action_label: None,
            persistent: true,
            scheduled_for: Some(now),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "reminder");
        assert_eq!(json["actionUrl"], "/tasks");
        assert!(json.get("actionLabel").is_none());
        assert!(json.get("scheduledFor").is_some());
        let back: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn due_only_when_unread_and_past() {
        let now = Utc::now();
        let mut n = Notification {
            id: "n1".into(),
            title: "t".into(),
            message: "m".into(),
            kind: NotificationKind::Reminder,
            timestamp: now,
            read: false,
            action_url: None,
            action_label: None,
            persistent: true,
            scheduled_for: Some(now + Duration::minutes(5)),
        };
        assert!(!n.is_due(now));
        assert!(n.is_due(now + Duration::minutes(5)));
        n.read = true;
        assert!(!n.is_due(now + Duration::minutes(10)));
        n.read = false;
        n.scheduled_for = None;
        assert!(!n.is_due(now));
    }

    #[test]
    fn fired_copy_drops_schedule() {
        let n = NewNotification::new("a", "b", NotificationKind::Reminder)
            .persistent()
            .action_url("/calendar")
            .scheduled_for(Utc::now());
        let stored = Notification {
            id: "x".into(),
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind,
            timestamp: Utc::now(),
            read: false,
            action_url: n.action_url.clone(),
            action_label: None,
            persistent: n.persistent,
            scheduled_for: n.scheduled_for,
        };
        let copy = NewNotification::from(&stored);
        assert!(copy.scheduled_for.is_none());
        assert!(copy.persistent);
        assert_eq!(copy.action_url.as_deref(), Some("/calendar"));
    }
}
