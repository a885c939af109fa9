//! In-memory [`RecordStore`] for tests and dry runs.
//!
//! Enforces the same uniqueness rules as the database schema: one record
//! per URL and one per (owner, source, key).

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::source_id::SourceId;

use super::{PersistedRecord, RecordStore, Result, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, PersistedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = PersistedRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.write() {
            map.extend(records.into_iter().map(|r| (r.id, r)));
        }
        store
    }

    /// Snapshot of every record, ordered by owner then key.
    pub fn all(&self) -> Vec<PersistedRecord> {
        let mut records: Vec<_> = self
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| (a.owner_id, &a.key).cmp(&(b.owner_id, &b.key)));
        records
    }

    pub fn len(&self) -> usize {
        self.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, PersistedRecord>>> {
        self.records
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, PersistedRecord>>> {
        self.records
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn conflicts(existing: &PersistedRecord, candidate: &PersistedRecord) -> bool {
    existing.id != candidate.id
        && (existing.url == candidate.url
            || (existing.owner_id == candidate.owner_id
                && existing.source == candidate.source
                && existing.key == candidate.key))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, owner_id: i64, key: &str, source: SourceId) -> Result<Option<PersistedRecord>> {
        Ok(self
            .read()?
            .values()
            .find(|r| r.owner_id == owner_id && r.source == source && r.key == key)
            .cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Vec<PersistedRecord>> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.url == url)
            .cloned()
            .collect())
    }

    async fn create(&self, record: &PersistedRecord) -> Result<PersistedRecord> {
        let mut map = self.write()?;
        if map.contains_key(&record.id) || map.values().any(|r| conflicts(r, record)) {
            return Err(StoreError::Conflict {
                url: record.url.clone(),
            });
        }
        map.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn update(&self, record: &PersistedRecord) -> Result<PersistedRecord> {
        let mut map = self.write()?;
        if !map.contains_key(&record.id) {
            return Err(StoreError::NotFound {
                context: format!("id={}", record.id),
            });
        }
        if map.values().any(|r| conflicts(r, record)) {
            return Err(StoreError::Conflict {
                url: record.url.clone(),
            });
        }
        map.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn delete(&self, record: &PersistedRecord) -> Result<()> {
        self.write()?.remove(&record.id);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<PersistedRecord>> {
        let mut records: Vec<_> = self
            .read()?
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| (a.source.as_str(), &a.key).cmp(&(b.source.as_str(), &b.key)));
        Ok(records)
    }
}
