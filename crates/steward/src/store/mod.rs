//! Persisted record store consumed by the reconciliation engine.
//!
//! Every operation runs with system privilege: there is no per-user access
//! check at this layer.

mod database;
mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::source_id::SourceId;
use crate::source::CanonicalRecord;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another record already holds this URL or natural key.
    #[error("Repository {url} is already tracked")]
    Conflict { url: String },

    /// The record vanished between read and write.
    #[error("Record not found: {context}")]
    NotFound { context: String },

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Stored counterpart of a [`CanonicalRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub id: Uuid,
    pub owner_id: i64,
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub open_issue_count: u32,
    pub source: SourceId,
    pub url: String,
    pub content_hash: String,
}

impl PersistedRecord {
    /// A new record owned by `owner_id`.
    pub fn new(owner_id: i64, record: &CanonicalRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            key: record.key.clone(),
            label: record.label.clone(),
            description: record.description.clone(),
            open_issue_count: record.open_issue_count,
            source: record.source,
            url: record.url.clone(),
            content_hash: record.content_hash(),
        }
    }

    /// This record carrying `record`'s content, keeping id and owner.
    #[must_use]
    pub fn refreshed(&self, record: &CanonicalRecord) -> Self {
        Self {
            id: self.id,
            ..Self::new(self.owner_id, record)
        }
    }

    pub fn to_canonical(&self) -> CanonicalRecord {
        CanonicalRecord {
            key: self.key.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            open_issue_count: self.open_issue_count,
            source: self.source,
            url: self.url.clone(),
        }
    }
}

/// Keyed storage for tracked repositories.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up by natural key.
    async fn find(&self, owner_id: i64, key: &str, source: SourceId) -> Result<Option<PersistedRecord>>;

    /// Every record with this URL, regardless of owner.
    async fn find_by_url(&self, url: &str) -> Result<Vec<PersistedRecord>>;

    /// Insert. Fails with [`StoreError::Conflict`] when the URL or natural key is taken.
    async fn create(&self, record: &PersistedRecord) -> Result<PersistedRecord>;

    /// Replace the content of an existing record.
    async fn update(&self, record: &PersistedRecord) -> Result<PersistedRecord>;

    /// Remove a record. Removing an already-missing record succeeds.
    async fn delete(&self, record: &PersistedRecord) -> Result<()>;

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<PersistedRecord>>;
}
