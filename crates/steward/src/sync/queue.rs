//! Fire-and-forget per-account work for periodic drivers.
//!
//! Workers pull account ids off a shared channel and run the same pipeline
//! as [`super::sync_all`]. Reports are collected and handed back when the
//! queue is shut down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::accounts::{AccountDirectory, AccountError};

use super::bulk::run_account;
use super::engine::SyncEngine;
use super::types::{AccountOutcome, AccountReport};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Sync queue is closed")]
    Closed,

    #[error(transparent)]
    Accounts(#[from] AccountError),
}

/// A pool of workers reconciling enqueued accounts.
pub struct SyncQueue {
    sender: Option<mpsc::UnboundedSender<i64>>,
    directory: Arc<dyn AccountDirectory>,
    workers: Vec<JoinHandle<Vec<AccountReport>>>,
}

impl SyncQueue {
    /// Start `workers` workers (at least one).
    pub fn spawn(
        engine: SyncEngine,
        directory: Arc<dyn AccountDirectory>,
        workers: usize,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<i64>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|_| {
                let engine = engine.clone();
                let directory = Arc::clone(&directory);
                let receiver = Arc::clone(&receiver);
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move {
                    let mut reports = Vec::new();
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(account_id) = next else { break };
                        reports.push(
                            process(&engine, directory.as_ref(), account_id, &shutdown).await,
                        );
                    }
                    reports
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            directory,
            workers,
        }
    }

    /// Queue one account for reconciliation.
    pub fn enqueue(&self, account_id: i64) -> Result<(), QueueError> {
        self.sender
            .as_ref()
            .ok_or(QueueError::Closed)?
            .send(account_id)
            .map_err(|_| QueueError::Closed)
    }

    /// Queue every active account. Returns how many were queued.
    pub async fn enqueue_all(&self) -> Result<usize, QueueError> {
        let accounts = self.directory.list_active_accounts().await?;
        for account in &accounts {
            self.enqueue(account.id)?;
        }
        Ok(accounts.len())
    }

    /// Stop accepting work. Queued ids are still processed.
    pub fn close(&mut self) {
        self.sender = None;
    }

    /// Close the queue and wait for the workers to drain it.
    ///
    /// Reports are ordered by account id.
    pub async fn shutdown(mut self) -> Vec<AccountReport> {
        self.close();
        let mut reports = Vec::new();
        for worker in self.workers.drain(..) {
            match worker.await {
                Ok(batch) => reports.extend(batch),
                Err(e) => tracing::error!(error = %e, "Sync queue worker panicked"),
            }
        }
        reports.sort_by_key(|r| r.account_id);
        reports
    }
}

async fn process(
    engine: &SyncEngine,
    directory: &dyn AccountDirectory,
    account_id: i64,
    shutdown: &AtomicBool,
) -> AccountReport {
    if shutdown.load(Ordering::SeqCst) {
        return AccountReport {
            account_id,
            account_name: String::new(),
            outcome: AccountOutcome::Cancelled,
        };
    }

    match directory.find_account(account_id).await {
        Ok(Some(account)) => AccountReport {
            account_id,
            account_name: account.name.clone(),
            outcome: run_account(engine, directory, &account).await,
        },
        Ok(None) => AccountReport {
            account_id,
            account_name: String::new(),
            outcome: AccountOutcome::Failed(format!("Account {} not found", account_id)),
        },
        Err(e) => AccountReport {
            account_id,
            account_name: String::new(),
            outcome: AccountOutcome::Failed(e.to_string()),
        },
    }
}
