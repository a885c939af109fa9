//! sea-orm backed [`RecordStore`].

use async_trait::async_trait;
use sea_orm::{ActiveValue, DatabaseConnection, Set};

use crate::entity::source_id::SourceId;
use crate::entity::tracked_repository::{ActiveModel, Model};
use crate::repository::{self, RepositoryError};

use super::{PersistedRecord, RecordStore, Result, StoreError};

/// Record store over the `tracked_repositories` table.
///
/// The unique index on `url` turns the uniqueness check-then-act into a
/// compare-and-swap: a racing second owner fails with
/// [`StoreError::Conflict`].
#[derive(Clone)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_record(model: Model) -> PersistedRecord {
    PersistedRecord {
        id: model.id,
        owner_id: model.owner_id,
        key: model.machine_name,
        label: model.label,
        description: model.description,
        open_issue_count: u32::try_from(model.open_issues).unwrap_or(0),
        source: model.source,
        url: model.url,
        content_hash: model.content_hash,
    }
}

fn to_active_model(record: &PersistedRecord) -> ActiveModel {
    ActiveModel {
        id: Set(record.id),
        owner_id: Set(record.owner_id),
        source: Set(record.source),
        machine_name: Set(record.key.clone()),
        url: Set(record.url.clone()),
        label: Set(record.label.clone()),
        description: Set(record.description.clone()),
        open_issues: Set(i32::try_from(record.open_issue_count).unwrap_or(i32::MAX)),
        content_hash: Set(record.content_hash.clone()),
        created_at: ActiveValue::NotSet,
        synced_at: ActiveValue::NotSet,
    }
}

fn map_err(err: RepositoryError, url: &str) -> StoreError {
    match err {
        RepositoryError::Duplicate { .. } => StoreError::Conflict {
            url: url.to_string(),
        },
        RepositoryError::NotFound { context } => StoreError::NotFound { context },
        other => StoreError::Backend(other.to_string()),
    }
}

fn backend(err: RepositoryError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl RecordStore for DatabaseStore {
    async fn find(&self, owner_id: i64, key: &str, source: SourceId) -> Result<Option<PersistedRecord>> {
        repository::find_by_natural_key(&self.db, owner_id, source, key)
            .await
            .map(|found| found.map(to_record))
            .map_err(backend)
    }

    async fn find_by_url(&self, url: &str) -> Result<Vec<PersistedRecord>> {
        repository::find_by_url(&self.db, url)
            .await
            .map(|models| models.into_iter().map(to_record).collect())
            .map_err(backend)
    }

    async fn create(&self, record: &PersistedRecord) -> Result<PersistedRecord> {
        repository::insert(&self.db, to_active_model(record))
            .await
            .map(to_record)
            .map_err(|e| map_err(e, &record.url))
    }

    async fn update(&self, record: &PersistedRecord) -> Result<PersistedRecord> {
        let mut model = to_active_model(record);
        // Only content columns change on update.
        model.id = ActiveValue::Unchanged(record.id);
        model.owner_id = ActiveValue::NotSet;
        repository::update(&self.db, model)
            .await
            .map(to_record)
            .map_err(|e| map_err(e, &record.url))
    }

    async fn delete(&self, record: &PersistedRecord) -> Result<()> {
        let removed = repository::delete(&self.db, record.id)
            .await
            .map_err(backend)?;
        if removed == 0 {
            tracing::debug!(key = %record.key, "Record already removed");
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<PersistedRecord>> {
        repository::find_by_owner(&self.db, owner_id)
            .await
            .map(|models| models.into_iter().map(to_record).collect())
            .map_err(backend)
    }
}
