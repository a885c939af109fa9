use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::source_id::SourceId;
use crate::entity::tracked_repository::{
    ActiveModel, Column, Entity as TrackedRepository, Model,
};

use super::errors::{RepositoryError, Result};

// ─── Single Record Operations ────────────────────────────────────────────────

/// Insert a new tracked repository.
///
/// A missing `id` is generated; missing timestamps default to now.
///
/// # Errors
/// Returns `RepositoryError::Duplicate` if the URL or natural key is already taken.
pub async fn insert(db: &DatabaseConnection, model: ActiveModel) -> Result<Model> {
    let mut model = model;
    if model.id.is_not_set() {
        model.id = Set(Uuid::new_v4());
    }
    let now = Utc::now().fixed_offset();
    if model.created_at.is_not_set() {
        model.created_at = Set(now);
    }
    if model.synced_at.is_not_set() {
        model.synced_at = Set(now);
    }
    let context = describe(&model);
    model
        .insert(db)
        .await
        .map_err(|e| RepositoryError::from_write(e, context))
}

/// Find a tracked repository by its UUID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>> {
    TrackedRepository::find_by_id(id)
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// Find a tracked repository by its natural key (owner + source + machine name).
pub async fn find_by_natural_key(
    db: &DatabaseConnection,
    owner_id: i64,
    source: SourceId,
    machine_name: &str,
) -> Result<Option<Model>> {
    TrackedRepository::find()
        .filter(Column::OwnerId.eq(owner_id))
        .filter(Column::Source.eq(source))
        .filter(Column::MachineName.eq(machine_name))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// Find every tracked repository pointing at `url`, regardless of owner.
pub async fn find_by_url(db: &DatabaseConnection, url: &str) -> Result<Vec<Model>> {
    TrackedRepository::find()
        .filter(Column::Url.eq(url))
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Update an existing tracked repository and stamp `synced_at`.
///
/// # Errors
/// Returns `RepositoryError::Duplicate` if the new URL belongs to another record,
/// or `RepositoryError::NotFound` if the row no longer exists.
pub async fn update(db: &DatabaseConnection, model: ActiveModel) -> Result<Model> {
    let mut model = model;
    model.synced_at = Set(Utc::now().fixed_offset());
    let context = describe(&model);
    model.update(db).await.map_err(|e| match e {
        sea_orm::DbErr::RecordNotUpdated => RepositoryError::NotFound { context },
        other => RepositoryError::from_write(other, context),
    })
}

/// Delete a tracked repository by its UUID.
///
/// Returns the number of rows deleted (0 or 1).
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<u64> {
    let result = TrackedRepository::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}

fn describe(model: &ActiveModel) -> String {
    match (active_value(&model.source), active_value(&model.machine_name)) {
        (Some(source), Some(name)) => format!("{}/{}", source, name),
        _ => "tracked repository".to_string(),
    }
}

fn active_value<T: Into<sea_orm::Value>>(value: &ActiveValue<T>) -> Option<&T> {
    match value {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Some(value),
        ActiveValue::NotSet => None,
    }
}
