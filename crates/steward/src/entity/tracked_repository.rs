//! TrackedRepository entity - the persisted counterpart of a canonical record.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::source_id::SourceId;

/// A repository tracked on behalf of exactly one account.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracked_repositories")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Ownership ───────────────────────────────────────────────────────────
    /// Account that tracks this repository.
    pub owner_id: i64,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Adapter that produced the record.
    pub source: SourceId,
    /// Stable machine name within the source (reconciliation join key).
    pub machine_name: String,
    /// Canonical upstream URL. At most one account may hold a given URL.
    #[sea_orm(column_type = "Text", unique)]
    pub url: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    pub label: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub open_issues: i32,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// SHA-256 digest of the canonical record, see `CanonicalRecord::content_hash`.
    pub content_hash: String,
    pub created_at: DateTimeWithTimeZone,
    /// When the record was last written by a reconciliation pass.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::OwnerId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
