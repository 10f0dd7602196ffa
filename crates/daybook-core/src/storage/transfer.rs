//! Export, import and reset of every user-facing collection.
//!
//! The bundle is one pretty-printed JSON object with a field per collection
//! (`tasks`, `events`, ..., `studySessions`, ..., `settings`) plus
//! `exportDate`. Import is all-or-nothing on validation: the whole payload is
//! checked before the first key is written.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{StorageKey, Store};
use crate::error::{CoreError, TransferError};
use crate::model::{CalendarEvent, StudySession, Task, Transaction};

/// What an import wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Keys overwritten, in bundle order.
    pub imported: Vec<StorageKey>,
    /// `exportDate` of the bundle, if it had one.
    pub export_date: Option<String>,
}

fn bundle_field(key: StorageKey) -> &'static str {
    match key {
        StorageKey::StudySessions => "studySessions",
        other => other.as_str(),
    }
}

fn empty_value(key: StorageKey) -> Value {
    match key {
        StorageKey::Settings => Value::Object(Map::new()),
        _ => Value::Array(Vec::new()),
    }
}

/// Serialize every collection into a bundle stamped with `now`.
///
/// # Errors
/// Returns an error if the bundle cannot be encoded.
pub fn export_all(store: &Store, now: DateTime<Utc>) -> Result<String, CoreError> {
    let mut bundle = Map::new();
    for key in StorageKey::COLLECTIONS {
        let value: Value = store.get(key, empty_value(key));
        bundle.insert(bundle_field(key).to_string(), value);
    }
    bundle.insert(
        "exportDate".to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Ok(serde_json::to_string_pretty(&Value::Object(bundle))?)
}

fn check_records<T: DeserializeOwned>(
    value: &Value,
    field: &'static str,
    expected: &'static str,
) -> Result<(), TransferError> {
    Vec::<T>::deserialize(value)
        .map(|_| ())
        .map_err(|_| TransferError::WrongShape { field, expected })
}

fn validate(key: StorageKey, field: &'static str, value: &Value) -> Result<(), TransferError> {
    match key {
        StorageKey::Settings if !value.is_object() => Err(TransferError::WrongShape {
            field,
            expected: "an object",
        }),
        StorageKey::Settings => Ok(()),
        _ if !value.is_array() => Err(TransferError::WrongShape {
            field,
            expected: "an array",
        }),
        StorageKey::Tasks => check_records::<Task>(value, field, "an array of tasks"),
        StorageKey::Events => check_records::<CalendarEvent>(value, field, "an array of calendar events"),
        StorageKey::Transactions => {
            check_records::<Transaction>(value, field, "an array of transactions")
        }
        StorageKey::StudySessions => {
            check_records::<StudySession>(value, field, "an array of study sessions")
        }
        _ => Ok(()),
    }
}

/// Overwrite every collection present in `json`.
///
/// Fields that are absent or `null` leave their collection untouched;
/// unknown fields are ignored.
///
/// # Errors
/// Returns an error, with nothing written, if the payload is not a JSON
/// object or any known field has the wrong shape.
pub fn import_all(store: &Store, json: &str) -> Result<ImportSummary, TransferError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(bundle) = value else {
        return Err(TransferError::NotAnObject);
    };

    let mut writes = Vec::new();
    for key in StorageKey::COLLECTIONS {
        let field = bundle_field(key);
        match bundle.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => {
                validate(key, field, value)?;
                writes.push((key, value));
            }
        }
    }

    let mut summary = ImportSummary {
        imported: Vec::with_capacity(writes.len()),
        export_date: bundle
            .get("exportDate")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    for (key, value) in writes {
        store.set(key, value);
        summary.imported.push(key);
    }
    info!(keys = summary.imported.len(), "import finished");
    Ok(summary)
}

/// Remove every user-facing collection.
pub fn clear_all(store: &Store) {
    for key in StorageKey::COLLECTIONS {
        store.remove(key);
    }
    warn!("all collections cleared");
}
