//! Database operations for accounts, profile references and tracked repositories.
//!
//! These are plain async functions over a `DatabaseConnection`. The
//! [`store`](crate::store) and [`accounts`](crate::accounts) modules wrap them
//! behind the traits the reconciliation engine consumes.

mod accounts;
mod errors;
mod query;
mod single;

pub use accounts::{
    add_reference, create_account, find_account, list_accounts, list_active_accounts,
    references, remove_reference, set_active,
};
pub use errors::{RepositoryError, Result};
pub use query::{count, count_by_owner, count_by_source, find_all, find_by_owner};
pub use single::{delete, find_by_id, find_by_natural_key, find_by_url, insert, update};
