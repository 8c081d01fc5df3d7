use std::{
    collections::{BTreeMap, HashMap},
    sync::{PoisonError, RwLock},
};

use crate::{
    connection::{Connection, Record},
    errors::RepoError,
    types::ModelKey,
};

#[derive(Debug, Default)]
struct Collection {
    sequence: i64,
    rows: BTreeMap<ModelKey, Record>,
}

/// Process-local connection, used by tests and by the `memory` storage driver.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connection for MemoryConnection {
    fn driver(&self) -> &'static str {
        "memory"
    }

    fn increment(&self, collection: &str) -> Result<i64, RepoError> {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let entry = collections.entry(collection.to_string()).or_default();
        entry.sequence += 1;
        Ok(entry.sequence)
    }

    fn find(&self, collection: &str, key: &ModelKey) -> Result<Option<Record>, RepoError> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .and_then(|entry| entry.rows.get(key))
            .cloned())
    }

    fn all(&self, collection: &str) -> Result<Vec<Record>, RepoError> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .map(|entry| entry.rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&self, collection: &str, key: &ModelKey, record: &Record) -> Result<(), RepoError> {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let entry = collections.entry(collection.to_string()).or_default();
        if entry.rows.contains_key(key) {
            return Err(RepoError::Other {
                message: format!("duplicate key `{key}` in `{collection}`").into(),
            });
        }
        if let ModelKey::Int(value) = key {
            entry.sequence = entry.sequence.max(*value);
        }
        entry.rows.insert(key.clone(), record.clone());
        Ok(())
    }

    fn replace(&self, collection: &str, key: &ModelKey, record: &Record) -> Result<(), RepoError> {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let row = collections
            .get_mut(collection)
            .and_then(|entry| entry.rows.get_mut(key))
            .ok_or_else(|| RepoError::NotFound {
                key: Some(key.to_string()),
            })?;
        *row = record.clone();
        Ok(())
    }
}
