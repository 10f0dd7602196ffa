//! Core error types for daybook-core.
//!
//! Most of the runtime surface is fail-soft (the store, notification fan-out
//! and event dispatch log and carry on), so these errors show up mainly on
//! the explicitly fallible edges: opening the database, loading config,
//! importing data and mutating collections.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for daybook-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence medium errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Import/export errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Collection invariant violations
    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by a persistence medium.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No medium is attached (headless or disabled storage).
    #[error("persistent storage is unavailable")]
    Unavailable,

    /// Failed to open the backing database
    #[error("Failed to open storage at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The medium refused the write because it is full.
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised while importing a data bundle.
///
/// Any of these aborts the import before a single key is written.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The payload is not valid JSON.
    #[error("import payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload parsed but is not a JSON object.
    #[error("import payload must be a JSON object")]
    NotAnObject,

    /// A known field carries the wrong JSON shape.
    #[error("field '{field}' must be {expected}")]
    WrongShape {
        field: &'static str,
        expected: &'static str,
    },
}

/// Violations of the collection invariants.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollectionError {
    /// A record with this id is already stored under the key.
    #[error("record '{id}' already exists in '{key}'")]
    DuplicateId { key: String, id: String },

    /// No record with this id is stored under the key.
    #[error("record '{id}' not found in '{key}'")]
    NotFound { key: String, id: String },

    /// The stored array cannot be decoded, so it is not safe to rewrite.
    #[error("records in '{key}' cannot be decoded: {message}")]
    Unreadable { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => match err.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    StorageError::Locked
                }
                rusqlite::ErrorCode::DiskFull => StorageError::QuotaExceeded {
                    key: String::new(),
                },
                _ => StorageError::QueryFailed(err.to_string()),
            },
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
