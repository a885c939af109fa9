use steward::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::SyncingAccounts { count, concurrency } => {
                tracing::info!(count, concurrency, "Syncing accounts");
            }

            SyncProgress::AccountStarted { account_id, name } => {
                tracing::debug!(account_id, name = %name, "Account started");
            }

            SyncProgress::FetchingReferences { account_id, count } => {
                tracing::debug!(account_id, count, "Fetching references");
            }

            SyncProgress::ReferenceFetched {
                account_id,
                uri,
                key,
            } => {
                tracing::debug!(account_id, uri = %uri, key = %key, "Fetched");
            }

            SyncProgress::ReferenceFailed {
                account_id,
                uri,
                error,
            } => {
                tracing::warn!(account_id, uri = %uri, error = %error, "Reference skipped");
            }

            SyncProgress::RetryBackoff {
                url,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(url = %url, retry_after_ms, attempt, "Transient failure, retrying");
            }

            SyncProgress::ApplyingChanges {
                account_id,
                creates,
                updates,
                deletes,
                dry_run,
            } => {
                tracing::info!(account_id, creates, updates, deletes, dry_run, "Applying changes");
            }

            SyncProgress::RecordChanged {
                account_id,
                key,
                action,
            } => {
                tracing::debug!(account_id, key = %key, action = %action, "Record changed");
            }

            SyncProgress::AccountSynced {
                account_id,
                name,
                created,
                updated,
                deleted,
                errors,
            } => {
                tracing::info!(
                    account_id,
                    name = %name,
                    created,
                    updated,
                    deleted,
                    errors,
                    "Account synced"
                );
            }

            SyncProgress::AccountFailed {
                account_id,
                name,
                error,
            } => {
                tracing::error!(account_id, name = %name, error = %error, "Account failed");
            }

            SyncProgress::AccountCancelled { account_id, name } => {
                tracing::warn!(account_id, name = %name, "Account skipped, shutdown requested");
            }

            SyncProgress::SyncAccountsComplete {
                synced,
                failed,
                cancelled,
            } => {
                tracing::info!(synced, failed, cancelled, "Sync complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
