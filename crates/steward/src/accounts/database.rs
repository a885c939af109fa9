use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::entity::account::Model as AccountModel;
use crate::repository::{self, RepositoryError};

use super::{Account, AccountDirectory, AccountError, Result};

/// Account directory over the `accounts` and `account_references` tables.
///
/// Also manages profiles for the CLI.
#[derive(Clone)]
pub struct DatabaseAccounts {
    db: DatabaseConnection,
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate { context } => AccountError::Duplicate(context),
            RepositoryError::InvalidInput { message } => AccountError::Invalid(message),
            other => AccountError::Backend(other.to_string()),
        }
    }
}

impl DatabaseAccounts {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn hydrate(&self, model: AccountModel) -> Result<Account> {
        let references = self.reference_uris(model.id).await?;
        Ok(Account {
            id: model.id,
            name: model.name,
            active: model.active,
            references,
        })
    }

    async fn reference_uris(&self, account_id: i64) -> Result<Vec<String>> {
        Ok(repository::references(&self.db, account_id)
            .await?
            .into_iter()
            .map(|r| r.uri)
            .collect())
    }

    async fn require(&self, id: i64) -> Result<AccountModel> {
        repository::find_account(&self.db, id)
            .await?
            .ok_or(AccountError::NotFound(id))
    }

    /// Create an active account with an initial set of references.
    pub async fn create_account(&self, name: &str, references: &[String]) -> Result<Account> {
        let model = repository::create_account(&self.db, name).await?;
        for uri in references {
            repository::add_reference(&self.db, model.id, uri).await?;
        }
        self.hydrate(model).await
    }

    /// Every account, active or not, ordered by id.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for model in repository::list_accounts(&self.db).await? {
            accounts.push(self.hydrate(model).await?);
        }
        Ok(accounts)
    }

    /// Append `uri` to the profile.
    pub async fn add_reference(&self, account_id: i64, uri: &str) -> Result<Account> {
        let model = self.require(account_id).await?;
        repository::add_reference(&self.db, account_id, uri).await?;
        self.hydrate(model).await
    }

    /// Remove `uri` from the profile. Returns whether it was listed.
    pub async fn remove_reference(&self, account_id: i64, uri: &str) -> Result<bool> {
        self.require(account_id).await?;
        Ok(repository::remove_reference(&self.db, account_id, uri).await? > 0)
    }

    pub async fn set_active(&self, account_id: i64, active: bool) -> Result<Account> {
        let model = match repository::set_active(&self.db, account_id, active).await {
            Err(RepositoryError::NotFound { .. }) => return Err(AccountError::NotFound(account_id)),
            other => other?,
        };
        self.hydrate(model).await
    }
}

#[async_trait]
impl AccountDirectory for DatabaseAccounts {
    async fn list_active_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for model in repository::list_active_accounts(&self.db).await? {
            accounts.push(self.hydrate(model).await?);
        }
        Ok(accounts)
    }

    async fn find_account(&self, id: i64) -> Result<Option<Account>> {
        match repository::find_account(&self.db, id).await? {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    async fn get_references(&self, account: &Account) -> Result<Vec<String>> {
        self.reference_uris(account.id).await
    }
}
