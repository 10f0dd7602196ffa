//! # Daybook Core Library
//!
//! Core logic of a personal productivity dashboard: tasks, calendar,
//! finances and study sessions kept in one local store, with a notification
//! center and an event bus that keeps the modules consistent with each
//! other.
//!
//! ## Architecture
//!
//! - **Storage**: fail-soft JSON key/value store over SQLite (or memory),
//!   typed collections, TOML configuration and export/import bundles
//! - **Notifications**: capped most-recent-first list with quiet hours,
//!   scheduled reminders and an optional OS surface
//! - **Sync**: synchronous event bus whose built-in handlers create calendar
//!   reminders, flag schedule conflicts, watch spending and update stats
//! - **Insights**: productivity score and suggestions derived on demand
//!
//! Everything runs on one thread. Services are constructed explicitly and
//! shared through `Rc`; [`Dashboard`] wires them together and drives the
//! periodic sweeps.
//!
//! ## Key Components
//!
//! - [`Dashboard`]: service composition and sweep driver
//! - [`Store`]: persisted key/value state
//! - [`NotificationManager`]: notification center
//! - [`SyncManager`]: event bus
//! - [`Config`]: application configuration

pub mod clock;
pub mod dashboard;
pub mod error;
pub mod holidays;
pub mod ids;
pub mod insights;
pub mod logging;
pub mod model;
pub mod notifications;
pub mod scheduler;
pub mod storage;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dashboard::{Dashboard, TickReport};
pub use error::{CollectionError, ConfigError, CoreError, StorageError, TransferError};
pub use holidays::{Holiday, HolidayKind};
pub use insights::ProductivityInsights;
pub use model::{
    CalendarEvent, EventStatus, Priority, StudySession, Task, TaskContext, TaskStatus,
    Transaction, TransactionKind,
};
pub use notifications::{
    NewNotification, Notification, NotificationKind, NotificationManager, NotificationSettings,
    NotificationSurface,
};
pub use scheduler::SweepTimer;
pub use storage::{Collection, Config, StorageKey, Store};
pub use sync::{ProductivityStats, SyncEvent, SyncEventType, SyncManager, SyncPayload};
