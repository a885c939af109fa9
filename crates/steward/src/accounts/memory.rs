use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Account, AccountDirectory, AccountError, Result};

/// In-memory account directory for tests.
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: RwLock<BTreeMap<i64, Account>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active account with the next free id.
    pub fn add(&self, name: &str, references: &[&str]) -> Account {
        let mut map = match self.accounts.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = map.keys().next_back().map_or(1, |last| last + 1);
        let account = Account {
            id,
            name: name.to_string(),
            active: true,
            references: references.iter().map(|r| r.to_string()).collect(),
        };
        map.insert(id, account.clone());
        account
    }

    /// Replace the references of an account.
    pub fn set_references(&self, id: i64, references: &[&str]) -> Result<()> {
        self.modify(id, |account| {
            account.references = references.iter().map(|r| r.to_string()).collect();
        })
    }

    pub fn set_active(&self, id: i64, active: bool) -> Result<()> {
        self.modify(id, |account| account.active = active)
    }

    fn modify(&self, id: i64, change: impl FnOnce(&mut Account)) -> Result<()> {
        let mut map = self
            .accounts
            .write()
            .map_err(|_| AccountError::Backend("account lock poisoned".to_string()))?;
        let account = map.get_mut(&id).ok_or(AccountError::NotFound(id))?;
        change(account);
        Ok(())
    }

    fn snapshot(&self) -> Result<BTreeMap<i64, Account>> {
        self.accounts
            .read()
            .map(|map| map.clone())
            .map_err(|_| AccountError::Backend("account lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccounts {
    async fn list_active_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.snapshot()?.into_values().filter(|a| a.active).collect())
    }

    async fn find_account(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.snapshot()?.remove(&id))
    }

    async fn get_references(&self, account: &Account) -> Result<Vec<String>> {
        Ok(self
            .snapshot()?
            .remove(&account.id)
            .map(|a| a.references)
            .unwrap_or_default())
    }
}
