//! Bulk synchronizer: the engine fanned out over many accounts.
//!
//! Accounts are independent units of work run on a bounded pool. One
//! account failing never stops the others, and cancellation is only
//! observed between accounts so no pass is left half applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;

use crate::accounts::{Account, AccountDirectory};

use super::engine::SyncEngine;
use super::progress::{SyncProgress, emit};
use super::types::{AccountOutcome, AccountReport, BulkResult, ConcurrencyPolicy};

/// Run the engine for every account in `accounts`.
///
/// Reports come back in input order. When `shutdown` is set, accounts that
/// have not started yet are reported as [`AccountOutcome::Cancelled`].
pub async fn sync_all(
    engine: &SyncEngine,
    directory: &Arc<dyn AccountDirectory>,
    accounts: &[Account],
    policy: ConcurrencyPolicy,
    shutdown: Option<&Arc<AtomicBool>>,
) -> BulkResult {
    if accounts.is_empty() {
        return BulkResult::default();
    }

    let concurrency = policy.max_concurrent_accounts.max(1);
    emit(
        engine.progress(),
        SyncProgress::SyncingAccounts {
            count: accounts.len(),
            concurrency,
        },
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(accounts.len());

    for account in accounts {
        let account = account.clone();
        let engine = engine.clone();
        let directory = Arc::clone(directory);
        let semaphore = Arc::clone(&semaphore);
        let shutdown = shutdown.cloned();
        let account_id = account.id;
        let account_name = account.name.clone();

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return AccountOutcome::Failed("Semaphore closed unexpectedly".to_string());
                }
            };

            if shutdown.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                emit(
                    engine.progress(),
                    SyncProgress::AccountCancelled {
                        account_id: account.id,
                        name: account.name.clone(),
                    },
                );
                return AccountOutcome::Cancelled;
            }

            run_account(&engine, directory.as_ref(), &account).await
        });

        handles.push((account_id, account_name, handle));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (account_id, account_name, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => AccountOutcome::Failed(format!("Task panic: {}", e)),
        };
        reports.push(AccountReport {
            account_id,
            account_name,
            outcome,
        });
    }

    let result = BulkResult { reports };
    emit(
        engine.progress(),
        SyncProgress::SyncAccountsComplete {
            synced: result.synced(),
            failed: result.failed(),
            cancelled: result.cancelled(),
        },
    );
    result
}

/// One account's pipeline with progress reporting.
///
/// References are re-read from the directory so a profile edited after
/// the account list was loaded is honored.
pub(crate) async fn run_account(
    engine: &SyncEngine,
    directory: &dyn AccountDirectory,
    account: &Account,
) -> AccountOutcome {
    emit(
        engine.progress(),
        SyncProgress::AccountStarted {
            account_id: account.id,
            name: account.name.clone(),
        },
    );

    let synced = match directory.get_references(account).await {
        Ok(references) => engine
            .sync_references(account, &references)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match synced {
        Ok(result) => {
            tracing::info!("Updated repositories belonging to \"{}\".", account.name);
            emit(
                engine.progress(),
                SyncProgress::AccountSynced {
                    account_id: account.id,
                    name: account.name.clone(),
                    created: result.created,
                    updated: result.updated,
                    deleted: result.deleted,
                    errors: result.errors.len(),
                },
            );
            AccountOutcome::Synced(result)
        }
        Err(error) => {
            tracing::warn!(account_id = account.id, error = %error, "Account sync failed");
            emit(
                engine.progress(),
                SyncProgress::AccountFailed {
                    account_id: account.id,
                    name: account.name.clone(),
                    error: error.clone(),
                },
            );
            AccountOutcome::Failed(error)
        }
    }
}
