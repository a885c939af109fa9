//! Account profiles: who to reconcile, and which references they list.

mod database;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use database::DatabaseAccounts;
pub use memory::MemoryAccounts;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account {0} not found")]
    NotFound(i64),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Account directory error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AccountError>;

/// What the engine needs to know about an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub active: bool,
    /// Repository references in profile order.
    pub references: Vec<String>,
}

/// Source of account profiles.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Active accounts, ordered by id.
    async fn list_active_accounts(&self) -> Result<Vec<Account>>;

    async fn find_account(&self, id: i64) -> Result<Option<Account>>;

    /// Current references of `account`, in profile order.
    async fn get_references(&self, account: &Account) -> Result<Vec<String>>;
}
