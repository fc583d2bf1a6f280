// Path: crates/storage/src/memory.rs

//! An in-memory record store for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use veil_api::storage::{Record, RecordStore};
use veil_types::error::StorageError;

/// A `RecordStore` backed by a map. Honors expiry like the durable store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of live records (expired ones included until reaped).
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Record>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(records.get(key).filter(|r| !r.is_expired()).cloned())
    }

    async fn put(&self, key: &str, record: Record) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        records.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        records.remove(key);
        Ok(())
    }
}
