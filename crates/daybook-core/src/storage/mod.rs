//! Local persistence: a fail-soft JSON key/value store over a pluggable
//! medium, typed collections on top of it, TOML configuration and the
//! export/import bundle.

mod config;
pub mod collection;
pub mod medium;
pub mod store;
pub mod transfer;

pub use collection::{Collection, Record};
pub use config::{
    Config, InsightsConfig, LoggingConfig, NotificationsConfig, StorageConfig, SyncConfig,
};
pub use medium::{MemoryMedium, SqliteMedium, StorageMedium};
pub use store::Store;
pub use transfer::{clear_all, export_all, import_all, ImportSummary};

use std::fmt;
use std::path::PathBuf;

/// Returns `~/.config/daybook[-dev]/` based on DAYBOOK_ENV.
///
/// Set DAYBOOK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAYBOOK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("daybook-dev")
    } else {
        base_dir.join("daybook")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Every key the dashboard persists under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Tasks,
    Events,
    Transactions,
    Accounts,
    StudySessions,
    Books,
    Subjects,
    Settings,
    Habits,
    Notes,
    Notifications,
    NotificationSettings,
    SyncEvents,
    Stats,
}

impl StorageKey {
    /// User-facing collections, in export order.
    pub const COLLECTIONS: [StorageKey; 10] = [
        StorageKey::Tasks,
        StorageKey::Events,
        StorageKey::Transactions,
        StorageKey::Accounts,
        StorageKey::StudySessions,
        StorageKey::Books,
        StorageKey::Subjects,
        StorageKey::Settings,
        StorageKey::Habits,
        StorageKey::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Tasks => "tasks",
            StorageKey::Events => "events",
            StorageKey::Transactions => "transactions",
            StorageKey::Accounts => "accounts",
            StorageKey::StudySessions => "study_sessions",
            StorageKey::Books => "books",
            StorageKey::Subjects => "subjects",
            StorageKey::Settings => "settings",
            StorageKey::Habits => "habits",
            StorageKey::Notes => "notes",
            StorageKey::Notifications => "notifications",
            StorageKey::NotificationSettings => "notification_settings",
            StorageKey::SyncEvents => "sync_events",
            StorageKey::Stats => "stats",
        }
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
