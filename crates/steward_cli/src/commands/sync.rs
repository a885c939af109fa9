//! The sync command: reconcile accounts against their upstream repositories.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::style;
use sea_orm::DatabaseConnection;

use steward::sync::{AccountOutcome, AccountReport, ReferenceError, SyncResult};
use steward::{BulkResult, DatabaseAccounts, DatabaseStore, SyncService};

use crate::config::Config;
use crate::progress::ProgressReporter;

use super::sources::build_registry;

/// Options for the sync command.
#[derive(Debug, Clone, clap::Args)]
pub struct SyncArgs {
    /// Only sync this account (active or not)
    #[arg(short, long)]
    account: Option<i64>,

    /// Dry run - show what would change without writing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Maximum accounts reconciled at once (default from config or 4)
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Feed active accounts through a worker queue with this many workers
    #[arg(short = 'q', long, conflicts_with = "account")]
    queue: Option<usize>,
}

/// Handle the sync command.
pub async fn handle_sync(
    args: SyncArgs,
    config: &Config,
    db: &DatabaseConnection,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reporter = Arc::new(ProgressReporter::new());
    let registry = build_registry(config, Some(reporter.as_callback()))?;

    let service = SyncService::builder()
        .registry(registry)
        .store(Arc::new(DatabaseStore::new(db.clone())))
        .accounts(Arc::new(DatabaseAccounts::new(db.clone())))
        .options(config.sync_options(args.dry_run))
        .policy(config.concurrency_policy(args.concurrency))
        .progress(reporter.as_callback())
        .shutdown_flag(shutdown)
        .build()?;

    if let Some(account_id) = args.account {
        let result = service.run_for_account(account_id).await;
        reporter.finish();
        print_account_result(&format!("account {}", account_id), &result?);
        return Ok(());
    }

    let bulk = match args.queue {
        Some(workers) => {
            service.engine().registry().ensure_enabled()?;
            let queue = service.queue(workers);
            let queued = queue.enqueue_all().await?;
            tracing::info!(queued, workers, "Queued active accounts");
            BulkResult {
                reports: queue.shutdown().await,
            }
        }
        None => service.run_for_all().await?,
    };
    reporter.finish();

    print_bulk_result(&bulk);

    if service.is_shutdown_requested() {
        println!(
            "{} Interrupted: {} accounts were not started",
            style("⚠").yellow(),
            bulk.cancelled()
        );
    }

    Ok(())
}

fn print_account_result(label: &str, result: &SyncResult) {
    let verb = if result.dry_run { "Would apply" } else { "Applied" };
    println!(
        "{} {} {} changes for {}: {} created, {} updated, {} deleted ({} unchanged, {} skipped)",
        style("✓").green().bold(),
        verb,
        result.changes(),
        style(label).cyan(),
        result.created,
        result.updated,
        result.deleted,
        result.unchanged,
        result.skipped
    );
    print_reference_errors(&result.errors);
}

fn print_bulk_result(bulk: &BulkResult) {
    for AccountReport {
        account_id,
        account_name,
        outcome,
    } in &bulk.reports
    {
        let label = if account_name.is_empty() {
            format!("account {}", account_id)
        } else {
            account_name.clone()
        };
        match outcome {
            AccountOutcome::Synced(result) => print_account_result(&label, result),
            AccountOutcome::Failed(error) => {
                eprintln!("{} {}: {}", style("✗").red().bold(), label, error);
            }
            AccountOutcome::Cancelled => {}
        }
    }

    let totals = bulk.totals();
    println!();
    println!(
        "{} accounts synced, {} failed, {} cancelled; {} created, {} updated, {} deleted",
        style(bulk.synced()).bold(),
        bulk.failed(),
        bulk.cancelled(),
        totals.created,
        totals.updated,
        totals.deleted
    );
}

fn print_reference_errors(errors: &[ReferenceError]) {
    const MAX_SHOWN: usize = 10;

    for error in errors.iter().take(MAX_SHOWN) {
        eprintln!("  - {}: {}", error.uri, error.message);
    }
    if errors.len() > MAX_SHOWN {
        eprintln!("  ... and {} more errors", errors.len() - MAX_SHOWN);
    }
}
