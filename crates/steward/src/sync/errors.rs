use thiserror::Error;

use crate::accounts::AccountError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Failures that abort a pass for one account.
///
/// Per-reference problems are not errors at this level; they are collected
/// into [`super::SyncResult::errors`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// No adapters enabled. Returned before any reference is attempted.
    #[error(transparent)]
    Configuration(#[from] RegistryError),

    #[error("Account {0} not found")]
    AccountNotFound(i64),

    #[error(transparent)]
    Accounts(#[from] AccountError),

    /// The store could not be read; nothing was written.
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    /// A required builder field was not provided.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

pub type Result<T> = std::result::Result<T, SyncError>;
