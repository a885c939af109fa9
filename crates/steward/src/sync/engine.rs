//! Reconciliation engine: one account's references in, store mutations out.
//!
//! A pass runs in five phases:
//!
//! 1. resolve every reference to an adapter and fetch it (bounded fan-out,
//!    results consumed in reference order)
//! 2. accumulate records by key (last write wins per source, cross-source
//!    key reuse is a collision)
//! 3. drop records whose URL another account already holds
//! 4. diff against the store by natural key and content hash
//! 5. apply deletes, then updates, then creates (skipped in dry-run)
//!
//! Anything the account tracks that is not in the accumulated set is
//! deleted, even when that set is empty.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::accounts::Account;
use crate::entity::source_id::SourceId;
use crate::registry::SourceRegistry;
use crate::source::{CanonicalRecord, FailureKind, FetchFailure, FetchOutcome};
use crate::store::{PersistedRecord, RecordStore, StoreError};

use super::errors::Result;
use super::guard;
use super::notify::{NullNotifier, RepositoryEvent, RepositoryNotifier};
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{ChangeAction, ReferenceError, SyncOptions, SyncResult};

/// A reference after adapter resolution.
enum Resolved {
    Invalid(String),
    Fetching {
        uri: String,
        source: SourceId,
        handle: JoinHandle<FetchOutcome>,
    },
}

/// A fetched record and the reference that produced it.
#[derive(Debug, Clone)]
struct Candidate {
    uri: String,
    record: CanonicalRecord,
}

#[derive(Debug, Default)]
struct Plan {
    creates: Vec<(String, PersistedRecord)>,
    updates: Vec<(String, PersistedRecord)>,
    deletes: Vec<PersistedRecord>,
}

/// Diffs fetched records against the store for one account at a time.
#[derive(Clone)]
pub struct SyncEngine {
    registry: SourceRegistry,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn RepositoryNotifier>,
    options: SyncOptions,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl SyncEngine {
    pub fn new(registry: SourceRegistry, store: Arc<dyn RecordStore>) -> Self {
        Self {
            registry,
            store,
            notifier: Arc::new(NullNotifier),
            options: SyncOptions::default(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn RepositoryNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_deref()
    }

    /// Reconcile `account` against the references on its profile.
    pub async fn sync_account(&self, account: &Account) -> Result<SyncResult> {
        self.sync_references(account, &account.references).await
    }

    /// Reconcile `account` against an explicit reference list.
    ///
    /// # Errors
    ///
    /// Only pass-fatal conditions: no enabled adapters, or a store read
    /// failure before anything was written. Per-reference failures are in
    /// the returned [`SyncResult`].
    pub async fn sync_references(&self, account: &Account, references: &[String]) -> Result<SyncResult> {
        self.registry.ensure_enabled()?;

        let progress = self.on_progress.as_deref();
        let mut result = SyncResult {
            dry_run: self.options.dry_run,
            ..SyncResult::default()
        };

        let references = distinct_references(references);
        emit(
            progress,
            SyncProgress::FetchingReferences {
                account_id: account.id,
                count: references.len(),
            },
        );

        let found = self.fetch_all(account.id, references, &mut result).await?;
        let accumulated = self.accumulate(account.id, found, &mut result);

        let mut write_set = Vec::with_capacity(accumulated.len());
        for candidate in accumulated {
            if guard::is_unique(self.store.as_ref(), &candidate.record.url, account.id).await? {
                write_set.push(candidate);
            } else {
                self.reject(account.id, ReferenceError::uniqueness(&candidate.uri), &mut result);
            }
        }

        let plan = self.plan(account.id, write_set, &mut result).await?;
        self.apply(account, plan, &mut result).await;

        tracing::info!(
            account_id = account.id,
            created = result.created,
            updated = result.updated,
            deleted = result.deleted,
            unchanged = result.unchanged,
            errors = result.errors.len(),
            dry_run = result.dry_run,
            "Reconciled {}",
            account.name
        );

        Ok(result)
    }

    /// Resolve and fetch every reference, returning records in reference order.
    async fn fetch_all(
        &self,
        account_id: i64,
        references: Vec<String>,
        result: &mut SyncResult,
    ) -> Result<Vec<Candidate>> {
        let semaphore = Arc::new(Semaphore::new(self.options.fetch_concurrency.max(1)));
        let mut resolved = Vec::with_capacity(references.len());

        for uri in references {
            let Some(source) = self.registry.resolve(&uri)? else {
                resolved.push(Resolved::Invalid(uri));
                continue;
            };

            let semaphore = Arc::clone(&semaphore);
            let task_uri = uri.clone();
            let source_id = source.id();
            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return FetchOutcome::Empty(FetchFailure {
                            kind: FailureKind::Transport,
                            detail: "Semaphore closed unexpectedly".to_string(),
                        });
                    }
                };
                source.fetch(&task_uri).await
            });

            resolved.push(Resolved::Fetching {
                uri,
                source: source_id,
                handle,
            });
        }

        let mut found = Vec::new();
        for entry in resolved {
            match entry {
                Resolved::Invalid(uri) => {
                    self.reject(account_id, ReferenceError::validation(&uri), result);
                }
                Resolved::Fetching { uri, source, handle } => {
                    let outcome = handle.await.unwrap_or_else(|e| {
                        FetchOutcome::Empty(FetchFailure {
                            kind: FailureKind::Transport,
                            detail: format!("Task panic: {}", e),
                        })
                    });
                    match outcome {
                        FetchOutcome::Found(record) => {
                            emit(
                                self.on_progress.as_deref(),
                                SyncProgress::ReferenceFetched {
                                    account_id,
                                    uri: uri.clone(),
                                    key: record.key.clone(),
                                },
                            );
                            found.push(Candidate { uri, record });
                        }
                        FetchOutcome::Empty(failure) => {
                            let error = match failure.kind {
                                FailureKind::NotFound => ReferenceError::not_found(&uri),
                                FailureKind::Transport => ReferenceError::transport(&uri, source),
                                FailureKind::Decode => ReferenceError::decode(&uri, source),
                            };
                            self.reject(account_id, error, result);
                        }
                    }
                }
            }
        }

        Ok(found)
    }

    /// Key the fetched records, resolving repeats.
    fn accumulate(&self, account_id: i64, found: Vec<Candidate>, result: &mut SyncResult) -> Vec<Candidate> {
        let mut accumulated: Vec<Candidate> = Vec::with_capacity(found.len());

        for candidate in found {
            let Some(existing) = accumulated
                .iter_mut()
                .find(|c| c.record.key == candidate.record.key)
            else {
                accumulated.push(candidate);
                continue;
            };

            if existing.record.source != candidate.record.source {
                let error = ReferenceError::key_collision(
                    &candidate.uri,
                    &candidate.record.key,
                    existing.record.source,
                );
                tracing::warn!(
                    account_id,
                    key = %candidate.record.key,
                    first = %existing.record.source,
                    second = %candidate.record.source,
                    "Two sources produced the same key"
                );
                self.reject(account_id, error, result);
                continue;
            }

            tracing::debug!(
                account_id,
                key = %candidate.record.key,
                replaced = %existing.uri,
                by = %candidate.uri,
                "Repeated key, last write wins"
            );
            result.skipped += 1;
            *existing = candidate;
        }

        accumulated
    }

    /// Compute creates, updates and deletes. Reads only.
    async fn plan(&self, account_id: i64, write_set: Vec<Candidate>, result: &mut SyncResult) -> Result<Plan> {
        let mut plan = Plan::default();
        let keep: HashSet<(SourceId, String)> = write_set
            .iter()
            .map(|c| (c.record.source, c.record.key.clone()))
            .collect();

        for Candidate { uri, record } in write_set {
            match self.store.find(account_id, &record.key, record.source).await? {
                None => plan.creates.push((uri, PersistedRecord::new(account_id, &record))),
                Some(existing) if existing.content_hash != record.content_hash() => {
                    plan.updates.push((uri, existing.refreshed(&record)));
                }
                Some(_) => result.unchanged += 1,
            }
        }

        plan.deletes = self
            .store
            .list_by_owner(account_id)
            .await?
            .into_iter()
            .filter(|r| !keep.contains(&(r.source, r.key.clone())))
            .collect();

        Ok(plan)
    }

    async fn apply(&self, account: &Account, plan: Plan, result: &mut SyncResult) {
        let dry_run = self.options.dry_run;
        emit(
            self.on_progress.as_deref(),
            SyncProgress::ApplyingChanges {
                account_id: account.id,
                creates: plan.creates.len(),
                updates: plan.updates.len(),
                deletes: plan.deletes.len(),
                dry_run,
            },
        );

        for record in plan.deletes {
            let outcome = if dry_run { Ok(()) } else { self.store.delete(&record).await };
            match outcome {
                Ok(()) => {
                    result.deleted += 1;
                    self.changed(account, &record, ChangeAction::Deleted);
                }
                Err(err) => {
                    tracing::warn!(account_id = account.id, key = %record.key, error = %err, "Delete failed");
                    result.errors.push(ReferenceError::store(&record.url));
                }
            }
        }

        for (uri, record) in plan.updates {
            let outcome = if dry_run {
                Ok(record.clone())
            } else {
                self.store.update(&record).await
            };
            match outcome {
                Ok(_) => {
                    result.updated += 1;
                    self.changed(account, &record, ChangeAction::Updated);
                }
                Err(err) => self.write_failed(account.id, &uri, err, result),
            }
        }

        for (uri, record) in plan.creates {
            let outcome = if dry_run {
                Ok(record.clone())
            } else {
                self.store.create(&record).await
            };
            match outcome {
                Ok(_) => {
                    result.created += 1;
                    self.changed(account, &record, ChangeAction::Created);
                }
                Err(err) => self.write_failed(account.id, &uri, err, result),
            }
        }
    }

    fn changed(&self, account: &Account, record: &PersistedRecord, action: ChangeAction) {
        emit(
            self.on_progress.as_deref(),
            SyncProgress::RecordChanged {
                account_id: account.id,
                key: record.key.clone(),
                action,
            },
        );
        if !self.options.dry_run {
            self.notifier.notify(&RepositoryEvent {
                action,
                owner_id: account.id,
                owner_name: account.name.clone(),
                key: record.key.clone(),
                label: record.label.clone(),
                source: record.source,
                url: record.url.clone(),
            });
        }
    }

    fn write_failed(&self, account_id: i64, uri: &str, err: StoreError, result: &mut SyncResult) {
        tracing::warn!(account_id, uri, error = %err, "Write failed");
        let error = if err.is_conflict() {
            ReferenceError::uniqueness(uri)
        } else {
            ReferenceError::store(uri)
        };
        self.reject(account_id, error, result);
    }

    /// Record a per-reference failure; the reference is skipped.
    fn reject(&self, account_id: i64, error: ReferenceError, result: &mut SyncResult) {
        emit(
            self.on_progress.as_deref(),
            SyncProgress::ReferenceFailed {
                account_id,
                uri: error.uri.clone(),
                error: error.message.clone(),
            },
        );
        result.skipped += 1;
        result.errors.push(error);
    }
}

/// Trimmed, non-empty references with repeats removed, first occurrence kept.
fn distinct_references(references: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    references
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty() && seen.insert(*r))
        .map(str::to_string)
        .collect()
}
