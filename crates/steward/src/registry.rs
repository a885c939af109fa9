//! Adapter registry: the enabled adapters, in resolution order.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::http::{HttpError, HttpTransport};
use crate::source::{
    ApiRateLimiter, GITHUB_API_URL, GITLAB_HOST, RepositorySource, SourceId, UpstreamClient,
};
use crate::sync::ProgressCallback;

/// Default per-request timeout for upstream calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Nothing to validate or fetch with.
    #[error("There are no enabled repository plugins.")]
    NoSourcesEnabled,

    /// The source was enabled in configuration but left out of this build.
    #[error("Source {0} is not available in this build")]
    NotCompiled(SourceId),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error("Invalid GitLab host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },
}

/// GitHub connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            token: None,
        }
    }
}

/// GitLab connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabSettings {
    pub host: String,
    pub token: Option<String>,
}

impl Default for GitLabSettings {
    fn default() -> Self {
        Self {
            host: GITLAB_HOST.to_string(),
            token: None,
        }
    }
}

/// Which adapters to enable, and how to reach their upstreams.
///
/// Built by the caller and passed in; the registry never reads ambient
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Enabled sources in resolution order.
    pub enabled: Vec<SourceId>,
    pub github: GitHubSettings,
    pub gitlab: GitLabSettings,
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: SourceId::all().to_vec(),
            github: GitHubSettings::default(),
            gitlab: GitLabSettings::default(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Ordered set of enabled adapters.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn RepositorySource>>,
}

impl SourceRegistry {
    /// A registry over a custom adapter set, resolved in the given order.
    pub fn new(sources: Vec<Arc<dyn RepositorySource>>) -> Self {
        Self { sources }
    }

    /// Build the configured adapters over a reqwest transport.
    #[cfg(any(feature = "github", feature = "gitlab", feature = "yml"))]
    pub fn from_config(
        config: &RegistryConfig,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> Result<Self, RegistryError> {
        let transport = crate::http::reqwest_transport::ReqwestTransport::with_timeout(config.timeout)?;
        Self::with_transport(config, Arc::new(transport), on_progress)
    }

    /// Build the configured adapters over `transport`.
    ///
    /// Repeated sources in `config.enabled` are ignored after the first.
    pub fn with_transport(
        config: &RegistryConfig,
        transport: Arc<dyn HttpTransport>,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> Result<Self, RegistryError> {
        let mut sources: Vec<Arc<dyn RepositorySource>> = Vec::with_capacity(config.enabled.len());
        let mut seen: Vec<SourceId> = Vec::new();

        for &id in &config.enabled {
            if seen.contains(&id) {
                tracing::debug!(source = %id, "Ignoring repeated source in configuration");
                continue;
            }
            seen.push(id);

            let mut client = UpstreamClient::new(Arc::clone(&transport))
                .with_rate_limiter(ApiRateLimiter::for_source(id));
            if let Some(callback) = &on_progress {
                client = client.with_progress(Arc::clone(callback));
            }
            sources.push(build_source(id, client, config)?);
        }

        if sources.is_empty() {
            tracing::warn!("No repository sources enabled");
        }

        Ok(Self::new(sources))
    }

    /// First enabled adapter accepting `uri`.
    pub fn resolve(&self, uri: &str) -> Result<Option<Arc<dyn RepositorySource>>, RegistryError> {
        self.ensure_enabled()?;
        Ok(self.sources.iter().find(|s| s.validate(uri)).cloned())
    }

    /// Fail with [`RegistryError::NoSourcesEnabled`] when empty.
    pub fn ensure_enabled(&self) -> Result<(), RegistryError> {
        if self.sources.is_empty() {
            Err(RegistryError::NoSourcesEnabled)
        } else {
            Ok(())
        }
    }

    /// Every adapter's help text, space-joined, in registry order.
    pub fn help_text(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.help_text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn enabled(&self) -> Vec<SourceId> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<dyn RepositorySource>> {
        self.sources.iter().find(|s| s.id() == id).cloned()
    }

    pub fn sources(&self) -> &[Arc<dyn RepositorySource>] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("enabled", &self.enabled())
            .finish()
    }
}

#[allow(unused_variables)]
fn build_source(
    id: SourceId,
    client: UpstreamClient,
    config: &RegistryConfig,
) -> Result<Arc<dyn RepositorySource>, RegistryError> {
    match id {
        #[cfg(feature = "github")]
        SourceId::GitHub => Ok(Arc::new(
            crate::source::github::GitHubSource::new(client)
                .with_api_url(&config.github.api_url)
                .with_token(config.github.token.clone()),
        )),
        #[cfg(feature = "gitlab")]
        SourceId::GitLab => Ok(Arc::new(
            crate::source::gitlab::GitLabSource::new(client)
                .with_host(&config.gitlab.host)
                .map_err(|source| RegistryError::InvalidHost {
                    host: config.gitlab.host.clone(),
                    source,
                })?
                .with_token(config.gitlab.token.clone()),
        )),
        #[cfg(feature = "yml")]
        SourceId::Yml => Ok(Arc::new(crate::source::yml_remote::YmlRemoteSource::new(client))),
        #[allow(unreachable_patterns)]
        other => Err(RegistryError::NotCompiled(other)),
    }
}
