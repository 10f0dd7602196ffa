//! Fail-soft JSON key/value store.
//!
//! Reads fall back to the caller's default and writes degrade to no-ops on
//! any medium or encoding failure; the failure is logged and never reaches
//! the caller. Multi-key writes are independent single-key writes, so a
//! failure partway through leaves the earlier keys written.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::medium::{MemoryMedium, SqliteMedium, StorageMedium};
use crate::error::StorageError;

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "productivity";

pub struct Store {
    medium: Option<Box<dyn StorageMedium>>,
    namespace: String,
}

impl Store {
    pub fn new(medium: impl StorageMedium + 'static, namespace: impl Into<String>) -> Self {
        Self {
            medium: Some(Box::new(medium)),
            namespace: namespace.into(),
        }
    }

    /// Open the SQLite medium at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open(path: &Path, namespace: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self::new(SqliteMedium::open(path)?, namespace))
    }

    /// Ephemeral store under the default namespace.
    pub fn in_memory() -> Self {
        Self::new(MemoryMedium::new(), DEFAULT_NAMESPACE)
    }

    /// A store with no medium: every read yields the default, every write is dropped.
    pub fn unavailable() -> Self {
        Self {
            medium: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.medium.is_some()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}_{}", self.namespace, key)
    }

    fn medium(&self) -> Result<&dyn StorageMedium, StorageError> {
        self.medium.as_deref().ok_or(StorageError::Unavailable)
    }

    /// Read and decode `key`, or return `default`.
    pub fn get<T: DeserializeOwned>(&self, key: impl AsRef<str>, default: T) -> T {
        let key = key.as_ref();
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!(key, error = %e, "storage read failed, using default");
                default
            }
        }
    }

    /// Read and decode `key`, surfacing failures.
    ///
    /// A missing medium reads as an absent key and logs a warning.
    pub fn try_get<T: DeserializeOwned>(
        &self,
        key: impl AsRef<str>,
    ) -> Result<Option<T>, crate::error::CoreError> {
        let medium = match self.medium() {
            Ok(medium) => medium,
            Err(_) => {
                warn!(key = key.as_ref(), "storage unavailable, reading as absent");
                return Ok(None);
            }
        };
        match medium.read(&self.full_key(key.as_ref()))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write `value` under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl AsRef<str>, value: &T) {
        let key = key.as_ref();
        if let Err(e) = self.try_set(key, value) {
            warn!(key, error = %e, "storage write failed");
        }
    }

    /// Encode and write `value` under `key`, surfacing failures.
    pub fn try_set<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<str>,
        value: &T,
    ) -> Result<(), crate::error::CoreError> {
        let encoded = serde_json::to_string(value)?;
        self.medium()?
            .write(&self.full_key(key.as_ref()), &encoded)?;
        Ok(())
    }

    pub fn remove(&self, key: impl AsRef<str>) {
        let key = key.as_ref();
        let result = self
            .medium()
            .and_then(|medium| medium.delete(&self.full_key(key)));
        if let Err(e) = result {
            warn!(key, error = %e, "storage remove failed");
        }
    }

    /// Remove every key in this store's namespace.
    pub fn clear(&self) {
        let prefix = format!("{}_", self.namespace);
        let result = self
            .medium()
            .and_then(|medium| medium.clear_prefix(&prefix));
        if let Err(e) = result {
            warn!(namespace = %self.namespace, error = %e, "storage clear failed");
        }
    }
}
