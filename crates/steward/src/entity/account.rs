//! Account entity - the owners whose profiles list repository references.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique across accounts.
    #[sea_orm(unique)]
    pub name: String,
    /// Inactive accounts are skipped by bulk synchronization.
    #[sea_orm(default_value = true)]
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_reference::Entity")]
    References,
    #[sea_orm(has_many = "super::tracked_repository::Entity")]
    TrackedRepositories,
}

impl Related<super::account_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::References.def()
    }
}

impl Related<super::tracked_repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackedRepositories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
