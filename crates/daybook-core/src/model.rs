//! Domain records persisted in the dashboard collections.
//!
//! Enum values serialize to the labels the persisted data already uses
//! (`"Alta"`, `"Agendado"`, `"Despesa"`, ...); English aliases are accepted
//! on input. Fields a record does not model are kept in `extra` and written
//! back unchanged.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::Record;

/// Task priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Alta", alias = "high")]
    High,
    #[serde(rename = "Média", alias = "medium")]
    Medium,
    #[serde(rename = "Baixa", alias = "low")]
    Low,
}

/// Life area a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskContext {
    #[serde(rename = "Trabalho", alias = "work")]
    Work,
    #[serde(rename = "Faculdade", alias = "college")]
    College,
    #[serde(rename = "Pessoal", alias = "personal")]
    Personal,
}

impl TaskContext {
    /// The persisted label, also used as the per-context stats key.
    pub fn label(&self) -> &'static str {
        match self {
            TaskContext::Work => "Trabalho",
            TaskContext::College => "Faculdade",
            TaskContext::Personal => "Pessoal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "A Fazer", alias = "todo")]
    Todo,
    #[serde(rename = "Em Andamento", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Revisão", alias = "review")]
    Review,
    #[serde(rename = "Concluído", alias = "done")]
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stored as `""` by older data when the task has no deadline.
    #[serde(default, deserialize_with = "blank_date::deserialize")]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub context: TaskContext,
    pub status: TaskStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "Agendado", alias = "scheduled")]
    Scheduled,
    #[serde(rename = "Concluído", alias = "completed")]
    Completed,
    #[serde(rename = "Cancelado", alias = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Free-form category, e.g. "Reunião" or "Lembrete".
    #[serde(rename = "type")]
    pub kind: String,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Length in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarEvent {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl Record for CalendarEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "Receita", alias = "income")]
    Income,
    #[serde(rename = "Despesa", alias = "expense")]
    Expense,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub subject: String,
    /// Minutes studied.
    pub duration: u32,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for StudySession {
    fn id(&self) -> &str {
        &self.id
    }
}

/// `HH:MM` clock times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(s: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn format(time: &NaiveTime) -> String {
        time.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time '{raw}'")))
    }
}

/// Optional `YYYY-MM-DD` dates where `""` and `null` both mean "none".
pub mod blank_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid date '{s}': {e}"))),
        }
    }
}
