//! Steward - keeps each account's tracked repositories in step with the
//! references listed on its profile.
//!
//! Repository references are URLs pointing at GitHub, GitLab or a remote
//! YAML descriptor. Each pass fetches them through the enabled source
//! adapters, normalizes the results into [`source::CanonicalRecord`]s and
//! reconciles the account's stored records by content hash.
//!
//! # Features
//!
//! - `github`, `gitlab`, `yml` - compile the matching source adapter.
//! - `sqlite` - SQLite driver for the database-backed store.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use steward::{connect_and_migrate, DatabaseAccounts, DatabaseStore, RegistryConfig, SourceRegistry, SyncService};
//!
//! let db = connect_and_migrate("sqlite://steward.db?mode=rwc").await?;
//!
//! let service = SyncService::builder()
//!     .registry(SourceRegistry::from_config(&RegistryConfig::default(), None)?)
//!     .store(Arc::new(DatabaseStore::new(db.clone())))
//!     .accounts(Arc::new(DatabaseAccounts::new(db)))
//!     .build()?;
//!
//! let bulk = service.run_for_all().await?;
//! println!("{} accounts synced", bulk.synced());
//! ```

pub mod accounts;
pub mod db;
pub mod entity;
pub mod http;
pub mod registry;
pub mod repository;
pub mod retry;
pub mod service;
pub mod source;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;

pub use accounts::{Account, AccountDirectory, AccountError, DatabaseAccounts, MemoryAccounts};
pub use registry::{RegistryConfig, RegistryError, SourceRegistry};
pub use repository::RepositoryError;
pub use service::{SyncService, SyncServiceBuilder};
pub use source::{CanonicalRecord, FetchOutcome, RepositorySource, SourceError};
pub use store::{DatabaseStore, MemoryStore, PersistedRecord, RecordStore, StoreError};
pub use sync::{BulkResult, SyncEngine, SyncError, SyncOptions, SyncResult};
