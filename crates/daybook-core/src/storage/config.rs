//! TOML-based application configuration.
//!
//! Holds the tunables of the dashboard core:
//! - Storage location and key namespace
//! - Notification list capacity and sweep cadence
//! - Event bus capacity, sweep cadence and alert thresholds
//! - Insight suggestion thresholds
//! - Log level
//!
//! Configuration is stored at `~/.config/daybook/config.toml`. User
//! preferences that the UI edits (notification settings) live in the store,
//! not here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Where and how records are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefix for every persisted key (`<namespace>_<key>`).
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// SQLite file name inside the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

/// Notification center limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_notification_capacity")]
    pub capacity: usize,
    /// Seconds between scheduled-reminder sweeps.
    #[serde(default = "default_reminder_sweep_secs")]
    pub reminder_sweep_secs: u64,
    /// Seconds before a non-persistent OS notification closes itself.
    #[serde(default = "default_os_auto_dismiss_secs")]
    pub os_auto_dismiss_secs: u64,
}

/// Event bus limits and built-in handler thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    /// Seconds between sweeps for unprocessed events.
    #[serde(default = "default_event_sweep_secs")]
    pub event_sweep_secs: u64,
    /// Two scheduled events closer than this many minutes conflict.
    #[serde(default = "default_conflict_window_minutes")]
    pub conflict_window_minutes: u32,
    /// Clock time (HH:MM) of the calendar reminder created for urgent tasks.
    #[serde(default = "default_companion_reminder_time")]
    pub companion_reminder_time: String,
    #[serde(default = "default_monthly_expense_alert")]
    pub monthly_expense_alert: f64,
    #[serde(default = "default_large_transaction")]
    pub large_transaction: f64,
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: i64,
}

/// Thresholds for the productivity suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Suggest focusing when more open high-priority tasks than this exist.
    #[serde(default = "default_high_priority_backlog")]
    pub high_priority_backlog: usize,
    /// Suggest breaks when more scheduled events than this fall today.
    #[serde(default = "default_crowded_agenda")]
    pub crowded_agenda: usize,
    #[serde(default = "default_monthly_expense_warning")]
    pub monthly_expense_warning: f64,
    /// Congratulate once the streak is longer than this.
    #[serde(default = "default_streak_celebration")]
    pub streak_celebration: u32,
    /// Seconds between insight refreshes.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/daybook/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_namespace() -> String {
    crate::storage::store::DEFAULT_NAMESPACE.into()
}
fn default_database_file() -> String {
    "daybook.db".into()
}
fn default_notification_capacity() -> usize {
    100
}
fn default_reminder_sweep_secs() -> u64 {
    60
}
fn default_os_auto_dismiss_secs() -> u64 {
    5
}
fn default_event_log_capacity() -> usize {
    1000
}
fn default_event_sweep_secs() -> u64 {
    30
}
fn default_conflict_window_minutes() -> u32 {
    30
}
fn default_companion_reminder_time() -> String {
    "09:00".into()
}
fn default_monthly_expense_alert() -> f64 {
    3000.0
}
fn default_large_transaction() -> f64 {
    1000.0
}
fn default_event_retention_days() -> i64 {
    30
}
fn default_high_priority_backlog() -> usize {
    3
}
fn default_crowded_agenda() -> usize {
    5
}
fn default_monthly_expense_warning() -> f64 {
    2500.0
}
fn default_streak_celebration() -> u32 {
    7
}
fn default_refresh_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            database_file: default_database_file(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: default_notification_capacity(),
            reminder_sweep_secs: default_reminder_sweep_secs(),
            os_auto_dismiss_secs: default_os_auto_dismiss_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: default_event_log_capacity(),
            event_sweep_secs: default_event_sweep_secs(),
            conflict_window_minutes: default_conflict_window_minutes(),
            companion_reminder_time: default_companion_reminder_time(),
            monthly_expense_alert: default_monthly_expense_alert(),
            large_transaction: default_large_transaction(),
            event_retention_days: default_event_retention_days(),
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            high_priority_backlog: default_high_priority_backlog(),
            crowded_agenda: default_crowded_agenda(),
            monthly_expense_warning: default_monthly_expense_warning(),
            streak_celebration: default_streak_celebration(),
            refresh_secs: default_refresh_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/daybook"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.notifications.capacity, 100);
        assert_eq!(parsed.sync.event_log_capacity, 1000);
        assert_eq!(parsed.storage.namespace, "productivity");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[sync]\nlarge_transaction = 500.0\n").unwrap();
        assert_eq!(parsed.sync.large_transaction, 500.0);
        assert_eq!(parsed.sync.monthly_expense_alert, 3000.0);
        assert_eq!(parsed.insights.crowded_agenda, 5);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("sync.event_sweep_secs").as_deref(), Some("30"));
        assert_eq!(
            cfg.get("sync.companion_reminder_time").as_deref(),
            Some("09:00")
        );
        assert!(cfg.get("sync.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("notifications.capacity", "50").unwrap();
        cfg.set("sync.monthly_expense_alert", "4500.5").unwrap();
        cfg.set("logging.level", "debug").unwrap();
        assert_eq!(cfg.notifications.capacity, 50);
        assert_eq!(cfg.sync.monthly_expense_alert, 4500.5);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let result = cfg.set("sync.nonexistent_key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let result = cfg.set("notifications.capacity", "lots");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.notifications.reminder_sweep_secs, 60);
        assert!(path.exists());

        let mut edited = cfg.clone();
        edited.set("insights.streak_celebration", "10").unwrap();
        edited.save_to(&path).unwrap();
        assert_eq!(
            Config::load_from(&path).unwrap().insights.streak_celebration,
            10
        );
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\nbroken").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
