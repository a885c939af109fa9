//! SeaORM entity definitions for the steward database schema.

pub mod account;
pub mod account_reference;
pub mod prelude;
pub mod source_id;
pub mod tracked_repository;
