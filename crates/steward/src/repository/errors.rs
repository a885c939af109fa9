use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::source_id::SourceId;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Record not found.
    #[error("Record not found: {context}")]
    NotFound { context: String },

    /// A unique constraint rejected the write.
    #[error("Record already exists: {context}")]
    Duplicate { context: String },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepositoryError {
    /// Create a NotFound error for a UUID lookup.
    pub fn not_found_by_id(id: Uuid) -> Self {
        Self::NotFound {
            context: format!("id={}", id),
        }
    }

    /// Create a NotFound error for a natural key lookup.
    pub fn not_found_by_key(owner_id: i64, source: SourceId, machine_name: &str) -> Self {
        Self::NotFound {
            context: format!("owner={} {}/{}", owner_id, source, machine_name),
        }
    }

    /// Create a NotFound error for an account lookup.
    pub fn account_not_found(account_id: i64) -> Self {
        Self::NotFound {
            context: format!("account={}", account_id),
        }
    }

    /// Classify a write error, turning unique-constraint violations into `Duplicate`.
    pub fn from_write(err: DbErr, context: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Duplicate {
                context: context.into(),
            },
            _ => Self::Database(err),
        }
    }

    /// Whether this error came from a unique constraint.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
