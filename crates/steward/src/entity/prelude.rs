//! Common re-exports for convenient entity usage.

pub use super::account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as AccountEntity,
    Model as AccountModel,
};
pub use super::account_reference::{
    ActiveModel as AccountReferenceActiveModel, Column as AccountReferenceColumn,
    Entity as AccountReference, Model as AccountReferenceModel,
};
pub use super::source_id::SourceId;
pub use super::tracked_repository::{
    ActiveModel as TrackedRepositoryActiveModel, Column as TrackedRepositoryColumn,
    Entity as TrackedRepository, Model as TrackedRepositoryModel,
};
