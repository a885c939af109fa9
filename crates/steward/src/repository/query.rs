use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entity::source_id::SourceId;
use crate::entity::tracked_repository::{Column, Entity as TrackedRepository, Model};

use super::errors::{RepositoryError, Result};

// ─── Query Operations ────────────────────────────────────────────────────────

/// All repositories tracked by one account, ordered by source then machine name.
pub async fn find_by_owner(db: &DatabaseConnection, owner_id: i64) -> Result<Vec<Model>> {
    TrackedRepository::find()
        .filter(Column::OwnerId.eq(owner_id))
        .order_by_asc(Column::Source)
        .order_by_asc(Column::MachineName)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Every tracked repository, grouped by owner.
pub async fn find_all(db: &DatabaseConnection) -> Result<Vec<Model>> {
    TrackedRepository::find()
        .order_by_asc(Column::OwnerId)
        .order_by_asc(Column::Source)
        .order_by_asc(Column::MachineName)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Count all tracked repositories.
pub async fn count(db: &DatabaseConnection) -> Result<u64> {
    TrackedRepository::find()
        .count(db)
        .await
        .map_err(RepositoryError::from)
}

/// Count repositories tracked by one account.
pub async fn count_by_owner(db: &DatabaseConnection, owner_id: i64) -> Result<u64> {
    TrackedRepository::find()
        .filter(Column::OwnerId.eq(owner_id))
        .count(db)
        .await
        .map_err(RepositoryError::from)
}

/// Count repositories produced by one source.
pub async fn count_by_source(db: &DatabaseConnection, source: SourceId) -> Result<u64> {
    TrackedRepository::find()
        .filter(Column::Source.eq(source))
        .count(db)
        .await
        .map_err(RepositoryError::from)
}
