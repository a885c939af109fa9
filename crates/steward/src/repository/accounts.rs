use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as Account,
    Model as AccountModel,
};
use crate::entity::account_reference::{
    ActiveModel as ReferenceActiveModel, Column as ReferenceColumn, Entity as AccountReference,
    Model as ReferenceModel,
};

use super::errors::{RepositoryError, Result};

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Create an active account.
///
/// # Errors
/// Returns `RepositoryError::Duplicate` if the name is taken.
pub async fn create_account(db: &DatabaseConnection, name: &str) -> Result<AccountModel> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RepositoryError::InvalidInput {
            message: "Account name cannot be empty".to_string(),
        });
    }

    let model = AccountActiveModel {
        name: Set(name.to_string()),
        active: Set(true),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    model
        .insert(db)
        .await
        .map_err(|e| RepositoryError::from_write(e, format!("account {}", name)))
}

/// Find an account by id.
pub async fn find_account(db: &DatabaseConnection, id: i64) -> Result<Option<AccountModel>> {
    Account::find_by_id(id)
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// List all accounts ordered by id.
pub async fn list_accounts(db: &DatabaseConnection) -> Result<Vec<AccountModel>> {
    Account::find()
        .order_by_asc(AccountColumn::Id)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// List active accounts ordered by id.
pub async fn list_active_accounts(db: &DatabaseConnection) -> Result<Vec<AccountModel>> {
    Account::find()
        .filter(AccountColumn::Active.eq(true))
        .order_by_asc(AccountColumn::Id)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Activate or deactivate an account.
pub async fn set_active(db: &DatabaseConnection, id: i64, active: bool) -> Result<AccountModel> {
    let existing = find_account(db, id)
        .await?
        .ok_or_else(|| RepositoryError::account_not_found(id))?;

    let mut model: AccountActiveModel = existing.into();
    model.active = Set(active);
    model.update(db).await.map_err(RepositoryError::from)
}

// ─── Profile References ──────────────────────────────────────────────────────

/// References on an account profile, in profile order.
pub async fn references(db: &DatabaseConnection, account_id: i64) -> Result<Vec<ReferenceModel>> {
    AccountReference::find()
        .filter(ReferenceColumn::AccountId.eq(account_id))
        .order_by_asc(ReferenceColumn::Position)
        .order_by_asc(ReferenceColumn::CreatedAt)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Append a reference to the end of an account profile.
///
/// # Errors
/// Returns `RepositoryError::NotFound` for an unknown account and
/// `RepositoryError::Duplicate` if the profile already lists `uri`.
pub async fn add_reference(
    db: &DatabaseConnection,
    account_id: i64,
    uri: &str,
) -> Result<ReferenceModel> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(RepositoryError::InvalidInput {
            message: "Repository URL cannot be empty".to_string(),
        });
    }
    if find_account(db, account_id).await?.is_none() {
        return Err(RepositoryError::account_not_found(account_id));
    }

    let last: Option<i32> = AccountReference::find()
        .select_only()
        .column_as(ReferenceColumn::Position.max(), "max_position")
        .filter(ReferenceColumn::AccountId.eq(account_id))
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();

    let model = ReferenceActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        position: Set(last.map_or(0, |p| p + 1)),
        uri: Set(uri.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    };
    model
        .insert(db)
        .await
        .map_err(|e| RepositoryError::from_write(e, format!("reference {}", uri)))
}

/// Remove a reference from an account profile.
///
/// Returns the number of rows deleted (0 or 1).
pub async fn remove_reference(db: &DatabaseConnection, account_id: i64, uri: &str) -> Result<u64> {
    let result = AccountReference::delete_many()
        .filter(ReferenceColumn::AccountId.eq(account_id))
        .filter(ReferenceColumn::Uri.eq(uri.trim()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
