//! Configuration file support for steward.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `STEWARD_`, e.g., `STEWARD_DATABASE_URL`)
//! 3. Config file (./steward.toml, then ~/.config/steward/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/steward/steward.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/steward/steward.db"  # optional, this is the default
//!
//! [sources]
//! enabled = ["github", "gitlab", "yml"]  # or STEWARD_SOURCES_ENABLED=github,yml
//!
//! [github]
//! token = "ghp_..."  # or use STEWARD_GITHUB_TOKEN env var
//! api_url = "https://api.github.com"
//!
//! [gitlab]
//! host = "https://gitlab.com"  # or self-hosted instance
//! token = "glpat-..."  # or use STEWARD_GITLAB_TOKEN env var
//!
//! [http]
//! timeout_secs = 30
//!
//! [sync]
//! concurrency = 4
//! fetch_concurrency = 4
//! dry_run = false
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use steward::SourceId;
use steward::registry::{DEFAULT_HTTP_TIMEOUT, GitHubSettings, GitLabSettings, RegistryConfig};
use steward::sync::{
    ConcurrencyPolicy, DEFAULT_ACCOUNT_CONCURRENCY, DEFAULT_FETCH_CONCURRENCY, SyncOptions,
};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Which adapters are enabled, in dispatch order.
    pub sources: SourcesConfig,
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// GitLab configuration.
    pub gitlab: GitLabConfig,
    /// Upstream HTTP settings.
    pub http: HttpConfig,
    /// Default sync options.
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    /// Defaults to `sqlite://~/.local/state/steward/steward.db` if not specified.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Enabled adapters. The first one accepting a URL handles it.
    pub enabled: Vec<SourceId>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: SourceId::all().to_vec(),
        }
    }
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via STEWARD_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// REST API base URL.
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: GitHubSettings::default().api_url,
        }
    }
}

/// GitLab configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// GitLab host (e.g., "gitlab.com" or "https://gitlab.example.com").
    /// Can also be set via STEWARD_GITLAB_HOST environment variable.
    pub host: String,
    /// GitLab API token (personal access token).
    /// Can also be set via STEWARD_GITLAB_TOKEN environment variable.
    pub token: Option<String>,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            host: GitLabSettings::default().host,
            token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
        }
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Accounts reconciled at once.
    pub concurrency: usize,
    /// Reference fetches in flight per account.
    pub fetch_concurrency: usize,
    /// Report changes without writing them.
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_ACCOUNT_CONCURRENCY,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/steward/config.toml)
    /// 3. Local config file (./steward.toml)
    /// 4. Environment variables with STEWARD_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        // Add XDG config file if it exists
        if let Some(proj_dirs) = ProjectDirs::from("", "", "steward") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        // Add local config file (higher priority than XDG)
        let local_config = PathBuf::from("steward.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./steward.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., STEWARD_DATABASE_URL -> database.url
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("STEWARD")
            .separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("sources.enabled")
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter enables read-write access and creates the file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("steward.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Adapter settings handed to the library.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            enabled: self.sources.enabled.clone(),
            github: GitHubSettings {
                api_url: self.github.api_url.clone(),
                token: self.github.token.clone(),
            },
            gitlab: GitLabSettings {
                host: self.gitlab.host.clone(),
                token: self.gitlab.token.clone(),
            },
            timeout: Duration::from_secs(self.http.timeout_secs.max(1)),
        }
    }

    /// Pass options with the `--dry-run` flag applied.
    pub fn sync_options(&self, dry_run: bool) -> SyncOptions {
        SyncOptions {
            dry_run: dry_run || self.sync.dry_run,
            fetch_concurrency: self.sync.fetch_concurrency.max(1),
        }
    }

    pub fn concurrency_policy(&self, concurrency: Option<usize>) -> ConcurrencyPolicy {
        ConcurrencyPolicy::bounded(concurrency.unwrap_or(self.sync.concurrency))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/steward` or `~/.local/state/steward`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "steward").map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
