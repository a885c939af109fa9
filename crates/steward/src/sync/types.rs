//! Result and option types shared by the engine, bulk synchronizer and queue.

use crate::entity::source_id::SourceId;

/// Default number of accounts synchronized at once.
pub const DEFAULT_ACCOUNT_CONCURRENCY: usize = 4;

/// Default number of reference fetches in flight for one account.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Transient transport failures are retried at most this many times.
pub const MAX_TRANSIENT_RETRIES: usize = 1;

/// Initial backoff delay in milliseconds before a transient retry.
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 5_000;

/// Options for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Compute and report the diff without touching the store or notifying.
    pub dry_run: bool,
    /// Maximum concurrent reference fetches within one account.
    pub fetch_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

/// Kinds of per-reference failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceErrorKind {
    /// No enabled adapter accepts the URL.
    Validation,
    /// An adapter accepted the URL but upstream has nothing there.
    NotFound,
    /// Network or authentication failure reaching upstream.
    Transport,
    /// Upstream answered with a payload that could not be mapped.
    Decode,
    /// The URL is already tracked by another account.
    UniquenessConflict,
    /// Two sources produced the same key for the same account.
    KeyCollision,
    /// The store rejected the write.
    Store,
}

impl std::fmt::Display for ReferenceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReferenceErrorKind::Validation => "not valid",
            ReferenceErrorKind::NotFound => "not found",
            ReferenceErrorKind::Transport => "transport",
            ReferenceErrorKind::Decode => "decode",
            ReferenceErrorKind::UniquenessConflict => "uniqueness conflict",
            ReferenceErrorKind::KeyCollision => "key collision",
            ReferenceErrorKind::Store => "store",
        };
        f.write_str(s)
    }
}

/// A failure attached to one repository reference.
///
/// `message` is suitable for showing next to the offending URL; transport
/// and decode details only go to the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceError {
    pub uri: String,
    pub kind: ReferenceErrorKind,
    pub message: String,
}

impl ReferenceError {
    pub fn validation(uri: &str) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::Validation,
            format!("The repository url {} is not valid.", uri),
        )
    }

    pub fn not_found(uri: &str) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::NotFound,
            format!("The repository at the url {} was not found.", uri),
        )
    }

    pub fn transport(uri: &str, source: SourceId) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::Transport,
            format!("Could not reach {} while fetching {}.", source, uri),
        )
    }

    pub fn decode(uri: &str, source: SourceId) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::Decode,
            format!("The {} response for {} could not be read.", source, uri),
        )
    }

    pub fn uniqueness(uri: &str) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::UniquenessConflict,
            format!("The repository at {} has been added by another user.", uri),
        )
    }

    pub fn key_collision(uri: &str, key: &str, existing: SourceId) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::KeyCollision,
            format!(
                "The repository at {} is named {}, which is already tracked from {}.",
                uri, key, existing
            ),
        )
    }

    pub fn store(uri: &str) -> Self {
        Self::new(
            uri,
            ReferenceErrorKind::Store,
            format!("The repository at {} could not be saved.", uri),
        )
    }

    fn new(uri: &str, kind: ReferenceErrorKind, message: String) -> Self {
        Self {
            uri: uri.to_string(),
            kind,
            message,
        }
    }
}

impl std::fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one reconciliation pass for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Records created (or that would be, in dry-run).
    pub created: usize,
    /// Records whose content hash changed.
    pub updated: usize,
    /// Records no longer referenced by the account.
    pub deleted: usize,
    /// Records fetched whose hash matched the stored one.
    pub unchanged: usize,
    /// References that produced neither a write nor an unchanged record.
    pub skipped: usize,
    /// Per-reference failures, in reference order.
    pub errors: Vec<ReferenceError>,
    /// Whether this result came from a dry run.
    pub dry_run: bool,
}

impl SyncResult {
    /// Total number of store mutations.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Errors of one kind.
    pub fn errors_of(&self, kind: ReferenceErrorKind) -> impl Iterator<Item = &ReferenceError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Kind of store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Created => f.write_str("created"),
            ChangeAction::Updated => f.write_str("updated"),
            ChangeAction::Deleted => f.write_str("deleted"),
        }
    }
}

/// Worker-pool bound for bulk synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyPolicy {
    /// Maximum number of accounts whose pipelines run at once.
    pub max_concurrent_accounts: usize,
}

impl ConcurrencyPolicy {
    /// Process one account at a time.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            max_concurrent_accounts: 1,
        }
    }

    #[must_use]
    pub fn bounded(max_concurrent_accounts: usize) -> Self {
        Self {
            max_concurrent_accounts: max_concurrent_accounts.max(1),
        }
    }
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self::bounded(DEFAULT_ACCOUNT_CONCURRENCY)
    }
}

/// What happened to one account in a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    /// The pass completed; reference-level failures are inside the result.
    Synced(SyncResult),
    /// The pass was aborted for this account.
    Failed(String),
    /// Cancellation was requested before the account started.
    Cancelled,
}

/// Per-account entry of a [`BulkResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub account_id: i64,
    pub account_name: String,
    pub outcome: AccountOutcome,
}

/// Aggregate result of a bulk run, one report per account in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResult {
    pub reports: Vec<AccountReport>,
}

impl BulkResult {
    #[must_use]
    pub fn synced(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Synced(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Failed(_)))
    }

    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Cancelled))
    }

    /// Sum of the per-account results that completed.
    #[must_use]
    pub fn totals(&self) -> SyncResult {
        let mut total = SyncResult::default();
        for report in &self.reports {
            if let AccountOutcome::Synced(result) = &report.outcome {
                total.created += result.created;
                total.updated += result.updated;
                total.deleted += result.deleted;
                total.unchanged += result.unchanged;
                total.skipped += result.skipped;
                total.errors.extend(result.errors.iter().cloned());
                total.dry_run |= result.dry_run;
            }
        }
        total
    }

    fn count(&self, pred: impl Fn(&AccountOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}
