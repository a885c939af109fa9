//! Progress reporting types for reconciliation passes.
//!
//! The engine and bulk synchronizer emit these events; front ends decide
//! whether to draw progress bars or write log lines.

use super::types::ChangeAction;

/// Progress events emitted during synchronization.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Starting a bulk run.
    SyncingAccounts {
        /// Number of accounts scheduled.
        count: usize,
        /// Maximum accounts in flight.
        concurrency: usize,
    },

    /// An account's pipeline started.
    AccountStarted { account_id: i64, name: String },

    /// Resolving and fetching the references of one account.
    FetchingReferences {
        account_id: i64,
        /// Number of distinct references on the profile.
        count: usize,
    },

    /// A reference was fetched and normalized.
    ReferenceFetched {
        account_id: i64,
        uri: String,
        key: String,
    },

    /// A reference produced an error and was excluded from the write set.
    ReferenceFailed {
        account_id: i64,
        uri: String,
        error: String,
    },

    /// A transient transport failure is being retried.
    RetryBackoff {
        /// Request URL being retried.
        url: String,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
        /// Current attempt number.
        attempt: u32,
    },

    /// The diff is computed and about to be applied.
    ApplyingChanges {
        account_id: i64,
        creates: usize,
        updates: usize,
        deletes: usize,
        dry_run: bool,
    },

    /// A single store mutation was applied (or planned, in dry-run).
    RecordChanged {
        account_id: i64,
        key: String,
        action: ChangeAction,
    },

    /// An account finished its pass.
    AccountSynced {
        account_id: i64,
        name: String,
        created: usize,
        updated: usize,
        deleted: usize,
        errors: usize,
    },

    /// An account's pass was aborted.
    AccountFailed {
        account_id: i64,
        name: String,
        error: String,
    },

    /// An account was skipped because shutdown was requested.
    AccountCancelled { account_id: i64, name: String },

    /// Bulk run finished.
    SyncAccountsComplete {
        synced: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            SyncProgress::AccountStarted {
                account_id: 1,
                name: "alice".to_string(),
            },
        );
        emit(
            Some(&callback),
            SyncProgress::AccountCancelled {
                account_id: 2,
                name: "bob".to_string(),
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            SyncProgress::SyncAccountsComplete {
                synced: 1,
                failed: 0,
                cancelled: 0,
            },
        );
    }

    #[test]
    fn test_events_are_recorded_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            events_clone.lock().unwrap().push(format!("{:?}", event));
        });

        emit(
            Some(&callback),
            SyncProgress::FetchingReferences {
                account_id: 7,
                count: 2,
            },
        );
        emit(
            Some(&callback),
            SyncProgress::RecordChanged {
                account_id: 7,
                key: "aquaman-repository".to_string(),
                action: ChangeAction::Created,
            },
        );

        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].contains("FetchingReferences"));
        assert!(recorded[1].contains("aquaman-repository"));
        assert!(recorded[1].contains("Created"));
    }
}
