//! Cross-module event bus.
//!
//! Modules announce changes (`task_created`, `transaction_added`, ...) and
//! the bus fans them out to subscribers, then runs one built-in handler per
//! type that keeps the calendar, notifications and stats consistent. The
//! log is persisted so an interrupted dispatch can be finished by the
//! periodic sweep.

pub mod event;
pub mod handlers;
pub mod manager;
pub mod stats;


pub use event::{SyncEvent, SyncEventType, SyncPayload};
pub use handlers::companion_id;
pub use manager::{InsightsWatch, SubscriberError, SubscriptionId, SyncManager};
pub use stats::{Activity, ProductivityStats};
