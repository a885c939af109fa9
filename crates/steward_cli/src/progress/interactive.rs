use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use steward::sync::{ChangeAction, SyncProgress};

/// Per-account spinner and running counts.
struct AccountState {
    bar: ProgressBar,
    created: usize,
    updated: usize,
    deleted: usize,
}

impl AccountState {
    fn summary(&self) -> String {
        format!("+{} ~{} -{}", self.created, self.updated, self.deleted)
    }
}

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Overall bar for bulk runs.
    accounts_bar: Option<ProgressBar>,
    /// Accounts whose pipelines are running.
    accounts: HashMap<i64, AccountState>,
    /// Accounts finished, failed or cancelled.
    done: usize,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            state: Mutex::new(ProgressState::default()),
        }
    }

    #[cfg(test)]
    pub fn accounts_in_flight(&self) -> usize {
        self.state.lock().map(|s| s.accounts.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn accounts_done(&self) -> usize {
        self.state.lock().map(|s| s.done).unwrap_or(0)
    }

    fn account_bar(&self, state: &mut ProgressState, account_id: i64, name: &str) {
        if state.accounts.contains_key(&account_id) {
            return;
        }
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_prefix(format!("{:12}", name));
        bar.set_message("Starting...");
        state.accounts.insert(
            account_id,
            AccountState {
                bar,
                created: 0,
                updated: 0,
                deleted: 0,
            },
        );
    }

    fn account_done(&self, state: &mut ProgressState, account_id: i64, message: String) {
        if let Some(account) = state.accounts.remove(&account_id) {
            account.bar.finish_with_message(message);
        }
        state.done += 1;
        if let Some(ref pb) = state.accounts_bar {
            pb.set_position(state.done as u64);
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::SyncingAccounts { count, concurrency } => {
                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:12}", "Accounts"));
                pb.set_message(format!("{} at a time", concurrency));
                state.accounts_bar = Some(pb);
            }

            SyncProgress::AccountStarted { account_id, name } => {
                self.account_bar(&mut state, account_id, &name);
            }

            SyncProgress::FetchingReferences { account_id, count } => {
                self.account_bar(&mut state, account_id, &format!("#{}", account_id));
                if let Some(account) = state.accounts.get(&account_id) {
                    account
                        .bar
                        .set_message(format!("Fetching {} references...", count));
                }
            }

            SyncProgress::ReferenceFetched {
                account_id, key, ..
            } => {
                if let Some(account) = state.accounts.get(&account_id) {
                    account.bar.set_message(format!("Fetched {}", key));
                }
            }

            SyncProgress::ReferenceFailed { uri, error, .. } => {
                drop(state);
                self.multi.println(format!("✗ {}: {}", uri, error)).ok();
            }

            SyncProgress::RetryBackoff {
                url,
                retry_after_ms,
                attempt,
            } => {
                drop(state);
                self.multi
                    .println(format!(
                        "⏳ {} failed, retry {} in {:.1}s",
                        url,
                        attempt,
                        retry_after_ms as f64 / 1000.0
                    ))
                    .ok();
            }

            SyncProgress::ApplyingChanges {
                account_id,
                creates,
                updates,
                deletes,
                dry_run,
            } => {
                if let Some(account) = state.accounts.get(&account_id) {
                    let verb = if dry_run { "Planning" } else { "Applying" };
                    account.bar.set_message(format!(
                        "{} +{} ~{} -{}...",
                        verb, creates, updates, deletes
                    ));
                }
            }

            SyncProgress::RecordChanged {
                account_id, action, ..
            } => {
                if let Some(account) = state.accounts.get_mut(&account_id) {
                    match action {
                        ChangeAction::Created => account.created += 1,
                        ChangeAction::Updated => account.updated += 1,
                        ChangeAction::Deleted => account.deleted += 1,
                    }
                    let summary = account.summary();
                    account.bar.set_message(summary);
                }
            }

            SyncProgress::AccountSynced {
                account_id,
                created,
                updated,
                deleted,
                errors,
                ..
            } => {
                let mut msg = format!("✓ +{} ~{} -{}", created, updated, deleted);
                if errors > 0 {
                    msg.push_str(&format!(" ({} skipped)", errors));
                }
                self.account_done(&mut state, account_id, msg);
            }

            SyncProgress::AccountFailed {
                account_id, error, ..
            } => {
                self.account_done(&mut state, account_id, format!("✗ {}", error));
            }

            SyncProgress::AccountCancelled { account_id, name } => {
                self.account_bar(&mut state, account_id, &name);
                self.account_done(&mut state, account_id, "⏹ cancelled".to_string());
            }

            SyncProgress::SyncAccountsComplete {
                synced,
                failed,
                cancelled,
            } => {
                if let Some(ref pb) = state.accounts_bar {
                    pb.finish_with_message(format!(
                        "✓ {} synced, {} failed, {} cancelled",
                        synced, failed, cancelled
                    ));
                }
            }

            _ => {}
        }
    }

    pub fn println(&self, line: &str) {
        self.multi.println(line).ok();
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for account in state.accounts.values() {
            if !account.bar.is_finished() {
                account.bar.finish();
            }
        }
        if let Some(ref pb) = state.accounts_bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
