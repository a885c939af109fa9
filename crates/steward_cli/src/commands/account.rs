//! Account profile commands.
//!
//! Manage who gets reconciled and which repository references they list.

use clap::Subcommand;
use console::style;
use sea_orm::DatabaseConnection;
use tabled::Tabled;

use steward::{Account, DatabaseAccounts};

use super::output::{OutputFormat, print_rows};

/// Account management subcommands.
#[derive(Subcommand)]
pub enum AccountAction {
    /// Create an account profile
    Add {
        /// Unique account name
        name: String,

        /// Repository references to track (can specify multiple)
        urls: Vec<String>,
    },
    /// List all accounts
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Append a repository reference to an account
    AddUrl {
        /// Account id
        id: i64,

        /// Repository reference (e.g. https://github.com/owner/repo)
        url: String,
    },
    /// Remove a repository reference from an account
    ///
    /// The tracked repository is deleted on the account's next sync.
    RemoveUrl {
        /// Account id
        id: i64,

        /// Repository reference to remove
        url: String,
    },
    /// Include an account in bulk syncs
    Activate {
        /// Account id
        id: i64,
    },
    /// Exclude an account from bulk syncs
    Deactivate {
        /// Account id
        id: i64,
    },
}

#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct AccountDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Active")]
    active: bool,
    #[tabled(rename = "References")]
    #[serde(skip)]
    reference_count: usize,
    #[tabled(skip)]
    references: Vec<String>,
}

impl From<&Account> for AccountDisplay {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            active: account.active,
            reference_count: account.references.len(),
            references: account.references.clone(),
        }
    }
}

/// Handle account management commands.
pub async fn handle_account(
    action: AccountAction,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = DatabaseAccounts::new(db.clone());

    match action {
        AccountAction::Add { name, urls } => {
            let account = accounts.create_account(&name, &urls).await?;
            println!(
                "{} Added account '{}' (id {}, {} references)",
                style("✓").green().bold(),
                style(&account.name).cyan(),
                account.id,
                account.references.len()
            );
        }
        AccountAction::List { output } => {
            let rows: Vec<AccountDisplay> = accounts
                .list_accounts()
                .await?
                .iter()
                .map(AccountDisplay::from)
                .collect();

            if rows.is_empty() && matches!(output, OutputFormat::Table) {
                println!("No accounts configured. Add one with: steward account add <name>");
                return Ok(());
            }
            print_rows(&rows, output)?;
        }
        AccountAction::AddUrl { id, url } => {
            let account = accounts.add_reference(id, &url).await?;
            println!(
                "{} Added {} to '{}'",
                style("✓").green().bold(),
                url,
                style(&account.name).cyan()
            );
        }
        AccountAction::RemoveUrl { id, url } => {
            if accounts.remove_reference(id, &url).await? {
                println!("{} Removed {}", style("✓").green().bold(), url);
            } else {
                println!(
                    "{} Account {} does not list {}",
                    style("⚠").yellow(),
                    id,
                    url
                );
            }
        }
        AccountAction::Activate { id } => {
            let account = accounts.set_active(id, true).await?;
            println!(
                "{} Activated '{}'",
                style("✓").green().bold(),
                style(&account.name).cyan()
            );
        }
        AccountAction::Deactivate { id } => {
            let account = accounts.set_active(id, false).await?;
            println!(
                "{} Deactivated '{}'",
                style("✓").green().bold(),
                style(&account.name).cyan()
            );
        }
    }

    Ok(())
}
