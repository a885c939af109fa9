//! Reconciliation: engine, uniqueness guard, bulk synchronizer and queue.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncOptions`, `SyncResult`, `BulkResult`, constants
//! - [`progress`] - `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - `SyncEngine`: one account's references in, store mutations out
//! - [`bulk`] - `sync_all()` over many accounts with bounded concurrency
//! - [`queue`] - `SyncQueue` for fire-and-forget per-account work
//!
//! # Example
//!
//! ```ignore
//! use steward::sync::{SyncEngine, SyncOptions};
//!
//! let engine = SyncEngine::new(registry, store).with_options(SyncOptions::default());
//! let result = engine.sync_account(&account).await?;
//! println!("created {} updated {} deleted {}", result.created, result.updated, result.deleted);
//! ```

pub mod bulk;
pub mod engine;
mod errors;
pub mod guard;
pub mod notify;
mod progress;
pub mod queue;
mod types;
pub mod validate;

pub use errors::{Result, SyncError};

pub use types::{
    AccountOutcome, AccountReport, BulkResult, ChangeAction, ConcurrencyPolicy, ReferenceError,
    ReferenceErrorKind, SyncOptions, SyncResult,
};

pub use types::{
    DEFAULT_ACCOUNT_CONCURRENCY, DEFAULT_FETCH_CONCURRENCY, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS,
    MAX_TRANSIENT_RETRIES,
};

pub use progress::{ProgressCallback, SyncProgress, emit};

pub use bulk::sync_all;
pub use engine::SyncEngine;
pub use guard::is_unique;
pub use notify::{ChannelNotifier, LoggingNotifier, NullNotifier, RepositoryEvent, RepositoryNotifier};
pub use queue::{QueueError, SyncQueue};
pub use validate::validate_references;
