//! Persistent record collections.
//!
//! A collection is an ordered array stored under one key; insertion order is
//! creation order and ids are unique per key. Each operation reads the latest
//! persisted array, applies the change and writes it back, so interleaved
//! sweeps and user actions never work from a stale snapshot.
//!
//! Reads skip records that no longer decode. Writes refuse to touch an array
//! holding such records, since writing back the decodable subset would drop
//! the rest.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::rc::Rc;
use tracing::warn;

use super::{Store, StorageKey};
use crate::error::CollectionError;

/// A record with a caller-generated unique id.
pub trait Record: Serialize + DeserializeOwned + Clone {
    fn id(&self) -> &str;
}

/// Every record under `key` that still decodes as `T`, in stored order.
pub fn read_records<T: DeserializeOwned>(store: &Store, key: StorageKey) -> Vec<T> {
    let raw = match store.try_get::<Vec<Value>>(key) {
        Ok(raw) => raw.unwrap_or_default(),
        Err(e) => {
            warn!(%key, error = %e, "collection unreadable, using empty list");
            return Vec::new();
        }
    };
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(%key, index, error = %e, "skipping undecodable record");
                None
            }
        })
        .collect()
}

pub struct Collection<T: Record> {
    store: Rc<Store>,
    key: StorageKey,
    _record: PhantomData<T>,
}

impl<T: Record> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            key: self.key,
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Rc<Store>, key: StorageKey) -> Self {
        Self {
            store,
            key,
            _record: PhantomData,
        }
    }

    pub fn key(&self) -> StorageKey {
        self.key
    }

    pub fn all(&self) -> Vec<T> {
        read_records(&self.store, self.key)
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.all().into_iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.all().iter().any(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// The full stored array, decoded without loss, for read-modify-write.
    fn load(&self) -> Result<Vec<T>, CollectionError> {
        let unreadable = |message: String| CollectionError::Unreadable {
            key: self.key.to_string(),
            message,
        };
        let raw = self
            .store
            .try_get::<Vec<Value>>(self.key)
            .map_err(|e| unreadable(e.to_string()))?
            .unwrap_or_default();
        raw.into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value)
                    .map_err(|e| unreadable(format!("record {index}: {e}")))
            })
            .collect()
    }

    /// Append a record.
    ///
    /// # Errors
    /// Returns [`CollectionError::DuplicateId`] if the id is already stored,
    /// or [`CollectionError::Unreadable`] if the stored array cannot be
    /// decoded; nothing is written in either case.
    pub fn insert(&self, record: T) -> Result<(), CollectionError> {
        let mut records = self.load()?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(self.duplicate(record.id()));
        }
        records.push(record);
        self.store.set(self.key, &records);
        Ok(())
    }

    /// Replace the record with the same id, or append it.
    ///
    /// # Errors
    /// Returns [`CollectionError::Unreadable`] if the stored array cannot be
    /// decoded.
    pub fn upsert(&self, record: T) -> Result<(), CollectionError> {
        let mut records = self.load()?;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.store.set(self.key, &records);
        Ok(())
    }

    /// Apply `updater` to the record with `id`.
    ///
    /// # Errors
    /// Returns [`CollectionError::NotFound`] if no record has this id, or
    /// [`CollectionError::Unreadable`] if the stored array cannot be decoded.
    pub fn update(&self, id: &str, updater: impl FnOnce(&mut T)) -> Result<(), CollectionError> {
        let mut records = self.load()?;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CollectionError::NotFound {
                key: self.key.to_string(),
                id: id.to_string(),
            })?;
        updater(record);
        self.store.set(self.key, &records);
        Ok(())
    }

    /// Remove the record with `id`. Returns whether anything was removed.
    ///
    /// # Errors
    /// Returns [`CollectionError::Unreadable`] if the stored array cannot be
    /// decoded.
    pub fn remove(&self, id: &str) -> Result<bool, CollectionError> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.store.set(self.key, &records);
        Ok(true)
    }

    /// Replace the whole collection.
    ///
    /// # Errors
    /// Returns [`CollectionError::DuplicateId`] if two records share an id;
    /// nothing is written in that case.
    pub fn replace_all(&self, records: Vec<T>) -> Result<(), CollectionError> {
        for (i, record) in records.iter().enumerate() {
            if records[..i].iter().any(|r| r.id() == record.id()) {
                return Err(self.duplicate(record.id()));
            }
        }
        self.store.set(self.key, &records);
        Ok(())
    }

    fn duplicate(&self, id: &str) -> CollectionError {
        CollectionError::DuplicateId {
            key: self.key.to_string(),
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Record for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.into(),
            body: body.into(),
        }
    }

    fn notes() -> Collection<Note> {
        Collection::new(Rc::new(Store::in_memory()), StorageKey::Notes)
    }

    fn seeded(raw: serde_json::Value) -> (Rc<Store>, Collection<Note>) {
        let store = Rc::new(Store::in_memory());
        store.set(StorageKey::Notes, &raw);
        (Rc::clone(&store), Collection::new(store, StorageKey::Notes))
    }

    #[test]
    fn insert_preserves_creation_order() {
        let notes = notes();
        notes.insert(note("a", "first")).unwrap();
        notes.insert(note("b", "second")).unwrap();
        let ids: Vec<String> = notes.all().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let notes = notes();
        notes.insert(note("a", "first")).unwrap();
        let err = notes.insert(note("a", "again")).unwrap_err();
        assert_eq!(
            err,
            CollectionError::DuplicateId {
                key: "notes".into(),
                id: "a".into()
            }
        );
        assert_eq!(notes.len(), 1);
        assert_eq!(notes.get("a").unwrap().body, "first");
    }

    #[test]
    fn update_and_remove() {
        let notes = notes();
        notes.insert(note("a", "first")).unwrap();
        notes.insert(note("b", "second")).unwrap();
        notes.update("b", |n| n.body = "edited".into()).unwrap();
        assert_eq!(notes.get("b").unwrap().body, "edited");
        assert!(notes.update("zzz", |_| {}).is_err());

        assert!(notes.remove("a").unwrap());
        assert!(!notes.remove("a").unwrap());
        assert_eq!(notes.all(), vec![note("b", "edited")]);
    }

    #[test]
    fn upsert_keeps_ids_unique() {
        let notes = notes();
        notes.upsert(note("a", "one")).unwrap();
        notes.upsert(note("a", "two")).unwrap();
        assert_eq!(notes.all(), vec![note("a", "two")]);
    }

    #[test]
    fn replace_all_rejects_duplicates_without_writing() {
        let notes = notes();
        notes.insert(note("keep", "me")).unwrap();
        let result = notes.replace_all(vec![note("x", "1"), note("x", "2")]);
        assert!(result.is_err());
        assert_eq!(notes.all(), vec![note("keep", "me")]);
    }

    #[test]
    fn clones_share_the_same_store() {
        let a = notes();
        let b = a.clone();
        a.insert(note("n", "shared")).unwrap();
        assert!(b.contains("n"));
    }

    #[test]
    fn reads_skip_records_that_do_not_decode() {
        let (_, notes) = seeded(json!([
            {"id": "a", "body": "ok"},
            {"id": "b"},
            {"id": "c", "body": "also ok"}
        ]));
        let ids: Vec<String> = notes.all().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn writes_refuse_to_drop_undecodable_records() {
        let raw = json!([{"id": "old", "title": "written by another version"}]);
        let (store, notes) = seeded(raw.clone());

        let err = notes.insert(note("new", "fresh")).unwrap_err();
        assert!(matches!(err, CollectionError::Unreadable { ref key, .. } if key == "notes"));
        assert!(notes.upsert(note("new", "fresh")).is_err());
        assert!(notes.remove("old").is_err());
        assert!(notes.update("old", |_| {}).is_err());

        let stored: serde_json::Value = store.get(StorageKey::Notes, serde_json::Value::Null);
        assert_eq!(stored, raw);
    }
}
