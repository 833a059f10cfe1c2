//! Persistence seam for the parse job
//!
//! This module provides:
//! - The `BlueprintStore` trait the job reads records from and writes parsed data to
//! - An in-memory store that assigns revisions and computes commits

use crate::domain::{BlueprintId, BlueprintRecord, Commit, ParsedBlueprintData};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Storage used by the post-commit parse job
#[async_trait]
pub trait BlueprintStore: Send + Sync {
    /// Load the committed record for a blueprint
    async fn load(&self, id: BlueprintId) -> Result<Option<BlueprintRecord>, StoreError>;

    /// Revision of the encoding the stored parsed data was derived from
    async fn parsed_revision(&self, id: BlueprintId) -> Result<Option<u64>, StoreError>;

    /// Persist parsed data, replacing any previous value
    async fn save_parsed(&self, data: ParsedBlueprintData) -> Result<(), StoreError>;
}

/// Store keeping everything in memory
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<BlueprintId, BlueprintRecord>>,
    parsed: RwLock<HashMap<BlueprintId, ParsedBlueprintData>>,
    parsed_writes: AtomicUsize,
    failing_writes: AtomicU32,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a record, assigning the next revision
    pub async fn commit(&self, mut record: BlueprintRecord) -> Commit {
        let mut records = self.records.write().await;
        let previous = records.get(&record.id);
        record.revision = previous.map_or(1, |p| p.revision + 1);
        let commit = Commit::between(previous, &record);
        records.insert(record.id, record);
        commit
    }

    /// Parsed data for a blueprint
    pub async fn parsed(&self, id: BlueprintId) -> Option<ParsedBlueprintData> {
        self.parsed.read().await.get(&id).cloned()
    }

    /// Number of successful parsed-data writes so far
    pub fn parsed_write_count(&self) -> usize {
        self.parsed_writes.load(Ordering::SeqCst)
    }

    /// Make the next `count` parsed-data writes fail
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlueprintStore for InMemoryStore {
    async fn load(&self, id: BlueprintId) -> Result<Option<BlueprintRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn parsed_revision(&self, id: BlueprintId) -> Result<Option<u64>, StoreError> {
        Ok(self.parsed.read().await.get(&id).map(|p| p.revision))
    }

    async fn save_parsed(&self, data: ParsedBlueprintData) -> Result<(), StoreError> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::unavailable("injected write failure"));
        }

        self.parsed.write().await.insert(data.blueprint_id, data);
        self.parsed_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
