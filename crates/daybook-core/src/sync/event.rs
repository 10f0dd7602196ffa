//! Sync event log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{CalendarEvent, StudySession, Task, Transaction};

/// Cross-module event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    TaskCreated,
    TaskUpdated,
    TaskCompleted,
    EventCreated,
    EventUpdated,
    TransactionAdded,
    StudySessionCompleted,
}

impl SyncEventType {
    pub const ALL: [SyncEventType; 7] = [
        SyncEventType::TaskCreated,
        SyncEventType::TaskUpdated,
        SyncEventType::TaskCompleted,
        SyncEventType::EventCreated,
        SyncEventType::EventUpdated,
        SyncEventType::TransactionAdded,
        SyncEventType::StudySessionCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventType::TaskCreated => "task_created",
            SyncEventType::TaskUpdated => "task_updated",
            SyncEventType::TaskCompleted => "task_completed",
            SyncEventType::EventCreated => "event_created",
            SyncEventType::EventUpdated => "event_updated",
            SyncEventType::TransactionAdded => "transaction_added",
            SyncEventType::StudySessionCompleted => "study_session_completed",
        }
    }
}

impl fmt::Display for SyncEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event body, keyed by event type.
///
/// Persisted as `{"type": "task_created", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SyncPayload {
    TaskCreated(Task),
    TaskUpdated(Task),
    TaskCompleted(Task),
    EventCreated(CalendarEvent),
    EventUpdated(CalendarEvent),
    TransactionAdded(Transaction),
    StudySessionCompleted(StudySession),
}

impl SyncPayload {
    pub fn event_type(&self) -> SyncEventType {
        match self {
            SyncPayload::TaskCreated(_) => SyncEventType::TaskCreated,
            SyncPayload::TaskUpdated(_) => SyncEventType::TaskUpdated,
            SyncPayload::TaskCompleted(_) => SyncEventType::TaskCompleted,
            SyncPayload::EventCreated(_) => SyncEventType::EventCreated,
            SyncPayload::EventUpdated(_) => SyncEventType::EventUpdated,
            SyncPayload::TransactionAdded(_) => SyncEventType::TransactionAdded,
            SyncPayload::StudySessionCompleted(_) => SyncEventType::StudySessionCompleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub id: String,
    #[serde(flatten)]
    pub payload: SyncPayload,
    pub timestamp: DateTime<Utc>,
    /// Set once subscribers and the built-in handler have run.
    pub processed: bool,
}

impl SyncEvent {
    pub fn event_type(&self) -> SyncEventType {
        self.payload.event_type()
    }
}
