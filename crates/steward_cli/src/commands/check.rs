//! Check candidate repository references before saving them to a profile.

use std::sync::Arc;

use console::style;
use sea_orm::DatabaseConnection;

use steward::{DatabaseAccounts, DatabaseStore, SyncService};

use crate::config::Config;

use super::sources::build_registry;

/// Validate `urls` as if account `account` were about to save them.
///
/// Returns an error when any reference is rejected so scripts can rely on
/// the exit status.
pub(crate) async fn handle_check(
    urls: Vec<String>,
    account: Option<i64>,
    config: &Config,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = SyncService::builder()
        .registry(build_registry(config, None)?)
        .store(Arc::new(DatabaseStore::new(db.clone())))
        .accounts(Arc::new(DatabaseAccounts::new(db.clone())))
        .build()?;

    // Id 0 is never assigned, so every stored record counts as another owner's.
    let messages = service
        .validate_references(account.unwrap_or(0), &urls)
        .await?;

    if messages.is_empty() {
        println!(
            "{} {} references look good",
            style("✓").green().bold(),
            urls.len()
        );
        return Ok(());
    }

    for message in &messages {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }
    Err(format!("{} references rejected", messages.len()).into())
}
