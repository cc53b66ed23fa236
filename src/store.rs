// src/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::PollRecord;

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: i64,
    pub record: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Written { version: i64 },
    Conflict,
    Missing,
}

/// Whole-record key-value storage with a version check on write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Versioned<PollRecord>>, StoreError>;

    /// Stores a new record at version 1. Fails if the id is taken.
    async fn insert(&self, record: &PollRecord) -> Result<(), StoreError>;

    /// Replaces the record only if it is still at `expected`.
    async fn compare_and_set(
        &self,
        id: &str,
        expected: i64,
        record: &PollRecord,
    ) -> Result<CasOutcome, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Versioned<PollRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Versioned<PollRecord>>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn insert(&self, record: &PollRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        records.insert(
            record.id.clone(),
            Versioned { version: 1, record: record.clone() },
        );
        Ok(())
    }

    async fn compare_and_set(
        &self,
        id: &str,
        expected: i64,
        record: &PollRecord,
    ) -> Result<CasOutcome, StoreError> {
        let mut records = self.records.write().await;
        let Some(current) = records.get_mut(id) else {
            return Ok(CasOutcome::Missing);
        };
        if current.version != expected {
            return Ok(CasOutcome::Conflict);
        }
        current.version += 1;
        current.record = record.clone();
        Ok(CasOutcome::Written { version: current.version })
    }
}
