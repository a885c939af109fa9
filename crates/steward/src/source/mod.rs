//! Source adapters: one per upstream kind.
//!
//! Every adapter validates URLs without touching the network, fetches raw
//! metadata through an [`UpstreamClient`] and maps it onto a
//! [`CanonicalRecord`]. Failures never escape [`RepositorySource::fetch`];
//! they come back as [`FetchOutcome::Empty`].

mod client;
mod errors;
mod rate_limit;
mod types;
pub mod uri;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "gitlab")]
pub mod gitlab;

#[cfg(feature = "yml")]
pub mod yml_remote;

use async_trait::async_trait;

pub use client::{MAX_PAGES, USER_AGENT, UpstreamClient, count_pages, next_link};
pub use errors::{FailureKind, FetchFailure, Result, SourceError, short_error_message};
pub use rate_limit::{ApiRateLimiter, default_rps_for_source, rate_limits};
pub use types::CanonicalRecord;

pub use crate::entity::source_id::SourceId;

/// Default GitHub REST API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Web origin of github.com.
pub const GITHUB_WEB_URL: &str = "https://github.com";

/// Default GitLab host.
pub const GITLAB_HOST: &str = "https://gitlab.com";

/// Result of fetching one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(CanonicalRecord),
    Empty(FetchFailure),
}

impl FetchOutcome {
    #[must_use]
    pub fn record(&self) -> Option<&CanonicalRecord> {
        match self {
            FetchOutcome::Found(record) => Some(record),
            FetchOutcome::Empty(_) => None,
        }
    }
}

/// Capability set shared by every adapter.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Identifier stored with every record this adapter produces.
    fn id(&self) -> SourceId;

    /// Whether `uri` has the shape this adapter accepts.
    fn validate(&self, uri: &str) -> bool;

    /// URL template shown to users.
    fn help_text(&self) -> String;

    /// Fetch and normalize one reference.
    async fn fetch_record(&self, uri: &str) -> Result<CanonicalRecord>;

    /// Fetch one reference, folding every failure into [`FetchOutcome::Empty`].
    async fn fetch(&self, uri: &str) -> FetchOutcome {
        match self.fetch_record(uri).await {
            Ok(record) => {
                tracing::debug!(source = %self.id(), uri, key = %record.key, "Repository found");
                FetchOutcome::Found(record)
            }
            Err(err) => {
                let failure = FetchFailure::from(&err);
                match failure.kind {
                    FailureKind::NotFound => {
                        tracing::info!(source = %self.id(), uri, "Repository not found");
                    }
                    FailureKind::Transport | FailureKind::Decode => {
                        tracing::warn!(source = %self.id(), uri, error = %failure.detail, "Fetch failed");
                    }
                }
                FetchOutcome::Empty(failure)
            }
        }
    }
}
