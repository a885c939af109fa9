//! Steward CLI - command-line driver for the repository reconciliation engine.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::account::AccountAction;
use crate::commands::output::OutputFormat;
use crate::commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "steward")]
#[command(version)]
#[command(about = "Keep tracked repositories in step with account profiles")]
#[command(
    long_about = "Steward reconciles the repository references listed in each account profile \
against a local store of tracked repositories. References may point at GitHub, GitLab or a \
remote YAML descriptor; each sync creates, updates and deletes tracked records so the store \
matches what upstream reports."
)]
#[command(after_long_help = r#"EXAMPLES
    Create an account tracking two repositories:
        $ steward account add ada https://github.com/rust-lang/rust https://gitlab.com/gitlab-org/gitlab

    Check references before saving them:
        $ steward check --account 1 https://example.com/project.yml

    Sync every active account, four at a time:
        $ steward sync --concurrency 4

    Dry run a single account:
        $ steward sync --account 1 --dry-run

    Generate shell completions:
        $ steward completions bash > ~/.local/share/bash-completion/completions/steward

CONFIGURATION
    Steward reads configuration from:
      1. ~/.config/steward/config.toml (or $XDG_CONFIG_HOME/steward/config.toml)
      2. ./steward.toml
      3. Environment variables (STEWARD_* prefix, e.g., STEWARD_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    STEWARD_DATABASE_URL      Database connection string (default: ~/.local/state/steward/steward.db)
    STEWARD_SOURCES_ENABLED   Comma-separated adapters in resolution order (default: github,gitlab,yml)
    STEWARD_GITHUB_TOKEN      GitHub personal access token
    STEWARD_GITLAB_TOKEN      GitLab personal access token
    STEWARD_GITLAB_HOST       GitLab host (default: https://gitlab.com)
    STEWARD_SYNC_CONCURRENCY  Accounts reconciled at once (default: 4)
    RUST_LOG                  Log filter when output is not a terminal"#)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage account profiles
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Reconcile accounts against upstream
    Sync(SyncArgs),
    /// List enabled repository adapters
    Sources {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Check repository references without saving them
    Check {
        /// References to check
        #[arg(required = true)]
        urls: Vec<String>,

        /// Account that would own the references
        #[arg(short, long)]
        account: Option<i64>,
    },
    /// List tracked repositories
    Repos {
        /// Only this account's repositories
        #[arg(short, long)]
        account: Option<i64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show applied and pending migrations
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

/// Create the parent directory of a file-backed SQLite database.
fn prepare_sqlite_path(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logs only when nobody is watching the progress bars
    if !Term::stdout().is_term() {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("steward=info,steward_cli=info"));

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Completions { shell } => return commands::meta::handle_completions(*shell),
        Commands::Man { output } => return commands::meta::handle_man(output.clone()),
        Commands::Sources { output } => {
            return commands::sources::handle_sources(*output, &config);
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database location; set STEWARD_DATABASE_URL")?;
    prepare_sqlite_path(&database_url)?;

    let command = match cli.command {
        Commands::Migrate { action } => {
            return commands::migrate::handle_migrate(action, &database_url).await;
        }
        command => command,
    };

    let db = steward::connect_and_migrate(&database_url).await?;

    match command {
        Commands::Account { action } => {
            commands::account::handle_account(action, &db).await?;
        }
        Commands::Sync(args) => {
            let shutdown = shutdown::setup_shutdown_handler();
            commands::sync::handle_sync(args, &config, &db, shutdown).await?;
        }
        Commands::Check { urls, account } => {
            commands::check::handle_check(urls, account, &config, &db).await?;
        }
        Commands::Repos { account, output } => {
            commands::repos::handle_repos(account, output, &db).await?;
        }
        Commands::Migrate { .. }
        | Commands::Sources { .. }
        | Commands::Completions { .. }
        | Commands::Man { .. } => {}
    }

    Ok(())
}
