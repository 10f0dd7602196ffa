//! Per-profile notification preferences.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::QuietHours;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    pub browser_notifications: bool,
    pub sound_enabled: bool,
    /// Offsets, in minutes before a due/start instant, at which reminders fire.
    pub reminder_minutes: Vec<u32>,
    pub task_reminders: bool,
    pub event_reminders: bool,
    pub study_reminders: bool,
    pub financial_alerts: bool,
    pub quiet_hours: QuietHours,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_notifications: false,
            sound_enabled: true,
            reminder_minutes: vec![15, 60, 1440],
            task_reminders: true,
            event_reminders: true,
            study_reminders: true,
            financial_alerts: true,
            quiet_hours: QuietHours::default(),
        }
    }
}

impl NotificationSettings {
    /// Defaults overlaid with whatever top-level fields `persisted` carries.
    ///
    /// Unknown fields are ignored. A field of the wrong type discards the
    /// whole override.
    pub fn merged_with(persisted: &Value) -> Self {
        let defaults = Self::default();
        let Some(overrides) = persisted.as_object() else {
            return defaults;
        };
        let mut merged = match serde_json::to_value(&defaults) {
            Ok(Value::Object(map)) => map,
            _ => return defaults,
        };
        for (key, value) in overrides {
            if merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(merged)).unwrap_or_else(|e| {
            warn!(error = %e, "discarding malformed notification settings");
            defaults
        })
    }

    /// Shallow merge: every `Some` field of `patch` replaces the current value.
    pub fn apply(&mut self, patch: SettingsPatch) {
        let SettingsPatch {
            enabled,
            browser_notifications,
            sound_enabled,
            reminder_minutes,
            task_reminders,
            event_reminders,
            study_reminders,
            financial_alerts,
            quiet_hours,
        } = patch;
        if let Some(v) = enabled {
            self.enabled = v;
        }
        if let Some(v) = browser_notifications {
            self.browser_notifications = v;
        }
        if let Some(v) = sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(v) = reminder_minutes {
            self.reminder_minutes = v;
        }
        if let Some(v) = task_reminders {
            self.task_reminders = v;
        }
        if let Some(v) = event_reminders {
            self.event_reminders = v;
        }
        if let Some(v) = study_reminders {
            self.study_reminders = v;
        }
        if let Some(v) = financial_alerts {
            self.financial_alerts = v;
        }
        if let Some(v) = quiet_hours {
            self.quiet_hours = v;
        }
    }
}

/// A partial update of [`NotificationSettings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub browser_notifications: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub reminder_minutes: Option<Vec<u32>>,
    pub task_reminders: Option<bool>,
    pub event_reminders: Option<bool>,
    pub study_reminders: Option<bool>,
    pub financial_alerts: Option<bool>,
    pub quiet_hours: Option<QuietHours>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_product_defaults() {
        let s = NotificationSettings::default();
        assert!(s.enabled);
        assert!(!s.browser_notifications);
        assert_eq!(s.reminder_minutes, vec![15, 60, 1440]);
        assert_eq!(s.quiet_hours.start, "22:00");
        assert!(!s.quiet_hours.enabled);
    }

    #[test]
    fn merge_overlays_partial_override() {
        let s = NotificationSettings::merged_with(&json!({
            "soundEnabled": false,
            "quietHours": {"enabled": true},
            "legacyField": 1
        }));
        assert!(!s.sound_enabled);
        assert!(s.enabled);
        assert!(s.quiet_hours.enabled);
        assert_eq!(s.quiet_hours.end, "08:00");
    }

    #[test]
    fn merge_discards_wrong_types() {
        let s = NotificationSettings::merged_with(&json!({"enabled": "yes"}));
        assert_eq!(s, NotificationSettings::default());
        let s = NotificationSettings::merged_with(&json!([1, 2]));
        assert_eq!(s, NotificationSettings::default());
    }

    #[test]
    fn patch_is_shallow() {
        let mut s = NotificationSettings::default();
        s.apply(SettingsPatch {
            financial_alerts: Some(false),
            reminder_minutes: Some(vec![5]),
            ..SettingsPatch::default()
        });
        assert!(!s.financial_alerts);
        assert_eq!(s.reminder_minutes, vec![5]);
        assert!(s.task_reminders);
    }
}
