//! Invocation surface for periodic and interactive drivers.
//!
//! # Example
//!
//! ```ignore
//! use steward::service::SyncService;
//!
//! let service = SyncService::builder()
//!     .registry(registry)
//!     .store(Arc::new(DatabaseStore::new(db.clone())))
//!     .accounts(Arc::new(DatabaseAccounts::new(db)))
//!     .notifier(Arc::new(LoggingNotifier))
//!     .build()?;
//!
//! let result = service.run_for_account(42).await?;
//! let bulk = service.run_for_all().await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::accounts::AccountDirectory;
use crate::registry::SourceRegistry;
use crate::store::RecordStore;
use crate::sync::{
    BulkResult, ConcurrencyPolicy, LoggingNotifier, ProgressCallback, RepositoryNotifier, Result,
    SyncEngine, SyncError, SyncOptions, SyncQueue, SyncResult, sync_all, validate_references,
};

/// Builder for [`SyncService`].
#[derive(Default)]
pub struct SyncServiceBuilder {
    registry: Option<SourceRegistry>,
    store: Option<Arc<dyn RecordStore>>,
    accounts: Option<Arc<dyn AccountDirectory>>,
    notifier: Option<Arc<dyn RepositoryNotifier>>,
    options: Option<SyncOptions>,
    policy: Option<ConcurrencyPolicy>,
    progress: Option<Arc<ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl SyncServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn accounts(mut self, accounts: Arc<dyn AccountDirectory>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Defaults to [`LoggingNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn RepositoryNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set the shutdown flag for cooperative cancellation.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// # Errors
    ///
    /// Returns `SyncError::MissingField` if registry, store or accounts are not set.
    pub fn build(self) -> Result<SyncService> {
        let registry = self
            .registry
            .ok_or(SyncError::MissingField { field: "registry" })?;
        let store = self
            .store
            .ok_or(SyncError::MissingField { field: "store" })?;
        let accounts = self
            .accounts
            .ok_or(SyncError::MissingField { field: "accounts" })?;

        let mut engine = SyncEngine::new(registry, store)
            .with_notifier(self.notifier.unwrap_or_else(|| Arc::new(LoggingNotifier)))
            .with_options(self.options.unwrap_or_default());
        if let Some(callback) = self.progress {
            engine = engine.with_progress(callback);
        }

        Ok(SyncService {
            engine,
            accounts,
            policy: self.policy.unwrap_or_default(),
            shutdown_flag: self
                .shutdown_flag
                .unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        })
    }
}

/// Entry points for running reconciliation passes.
pub struct SyncService {
    engine: SyncEngine,
    accounts: Arc<dyn AccountDirectory>,
    policy: ConcurrencyPolicy,
    shutdown_flag: Arc<AtomicBool>,
}

impl SyncService {
    pub fn builder() -> SyncServiceBuilder {
        SyncServiceBuilder::new()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn accounts(&self) -> &Arc<dyn AccountDirectory> {
        &self.accounts
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Reconcile one account, active or not.
    pub async fn run_for_account(&self, account_id: i64) -> Result<SyncResult> {
        let account = self
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(SyncError::AccountNotFound(account_id))?;
        let references = self.accounts.get_references(&account).await?;
        self.engine.sync_references(&account, &references).await
    }

    /// Reconcile every active account under the configured policy.
    ///
    /// # Errors
    ///
    /// Fails before touching any account when no adapters are enabled or
    /// the account list cannot be read.
    pub async fn run_for_all(&self) -> Result<BulkResult> {
        self.engine.registry().ensure_enabled()?;
        let accounts = self.accounts.list_active_accounts().await?;
        Ok(sync_all(
            &self.engine,
            &self.accounts,
            &accounts,
            self.policy,
            Some(&self.shutdown_flag),
        )
        .await)
    }

    /// Start a worker queue sharing this service's engine and shutdown flag.
    pub fn queue(&self, workers: usize) -> SyncQueue {
        SyncQueue::spawn(
            self.engine.clone(),
            Arc::clone(&self.accounts),
            workers,
            Arc::clone(&self.shutdown_flag),
        )
    }

    /// Expected URL shapes of every enabled adapter.
    pub fn help_text(&self) -> String {
        self.engine.registry().help_text()
    }

    /// Form feedback for a candidate reference list.
    pub async fn validate_references(&self, owner_id: i64, uris: &[String]) -> Result<Vec<String>> {
        Ok(validate_references(
            self.engine.registry(),
            self.engine.store().as_ref(),
            owner_id,
            uris,
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::MemoryAccounts;
    use crate::store::MemoryStore;

    #[test]
    fn test_build_requires_registry_store_and_accounts() {
        let missing = |builder: SyncServiceBuilder| match builder.build() {
            Err(SyncError::MissingField { field }) => field,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("build should fail"),
        };

        assert_eq!(missing(SyncService::builder()), "registry");
        assert_eq!(
            missing(SyncService::builder().registry(SourceRegistry::default())),
            "store"
        );
        assert_eq!(
            missing(
                SyncService::builder()
                    .registry(SourceRegistry::default())
                    .store(Arc::new(MemoryStore::new()))
            ),
            "accounts"
        );
    }

    #[tokio::test]
    async fn test_empty_registry_fails_before_any_account() {
        let accounts = Arc::new(MemoryAccounts::new());
        accounts.add("ada", &["https://example.com/a.yml"]);

        let service = SyncService::builder()
            .registry(SourceRegistry::default())
            .store(Arc::new(MemoryStore::new()))
            .accounts(accounts)
            .build()
            .expect("service should build");

        assert!(matches!(
            service.run_for_all().await,
            Err(SyncError::Configuration(_))
        ));
        assert!(matches!(
            service.run_for_account(1).await,
            Err(SyncError::Configuration(_))
        ));
        assert_eq!(
            service
                .validate_references(1, &["https://example.com/a.yml".to_string()])
                .await
                .expect("validation runs"),
            vec!["There are no enabled repository plugins."]
        );
    }

    #[tokio::test]
    async fn test_unknown_account_is_reported() {
        let service = SyncService::builder()
            .registry(SourceRegistry::default())
            .store(Arc::new(MemoryStore::new()))
            .accounts(Arc::new(MemoryAccounts::new()))
            .build()
            .expect("service should build");

        assert!(matches!(
            service.run_for_account(7).await,
            Err(SyncError::AccountNotFound(7))
        ));
    }
}
