//! GitHub adapter: `https://github.com/<owner>/<repo>`.

use async_trait::async_trait;
use serde::Deserialize;

use super::uri::ForgeBase;
use super::{
    CanonicalRecord, GITHUB_API_URL, GITHUB_WEB_URL, RepositorySource, Result, SourceError,
    SourceId, USER_AGENT, UpstreamClient, count_pages,
};
use crate::http::HttpRequest;

const ISSUES_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    full_name: String,
    name: String,
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    has_issues: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    state: String,
    /// Present when the item is a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    fn is_open_issue(&self) -> bool {
        self.state == "open" && self.pull_request.is_none()
    }
}

/// Adapter for repositories hosted on github.com.
#[derive(Clone)]
pub struct GitHubSource {
    client: UpstreamClient,
    web: ForgeBase,
    api_url: String,
    token: Option<String>,
}

impl GitHubSource {
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            web: ForgeBase::from_origin(GITHUB_WEB_URL),
            api_url: GITHUB_API_URL.to_string(),
            token: None,
        }
    }

    /// Point at a different API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn request(&self, url: String) -> HttpRequest {
        let request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Owner and repository name from an accepted URL.
    fn owner_and_name(&self, uri: &str) -> Option<(String, String)> {
        let mut segments = self.web.repo_segments(uri)?.into_iter();
        Some((segments.next()?, segments.next()?))
    }
}

#[async_trait]
impl RepositorySource for GitHubSource {
    fn id(&self) -> SourceId {
        SourceId::GitHub
    }

    fn validate(&self, uri: &str) -> bool {
        self.web.accepts(uri)
    }

    fn help_text(&self) -> String {
        format!("{}/{{owner_name}}/{{repo_name}}", self.web.as_str())
    }

    async fn fetch_record(&self, uri: &str) -> Result<CanonicalRecord> {
        let (owner, name) = self.owner_and_name(uri).ok_or_else(|| SourceError::unsupported(uri))?;
        let repo_url = format!("{}/repos/{}/{}", self.api_url, owner, name);

        let (repo, _): (GitHubRepo, _) = self.client.get_json(self.request(repo_url.clone())).await?;

        let open_issue_count = if repo.has_issues == Some(false) {
            0
        } else {
            let first = self.request(format!(
                "{}/issues?state=all&per_page={}",
                repo_url, ISSUES_PAGE_SIZE
            ));
            count_pages::<GitHubIssue, _>(&self.client, first, GitHubIssue::is_open_issue).await?
        };

        Ok(CanonicalRecord {
            key: repo.full_name,
            label: repo.name,
            description: repo.description,
            open_issue_count,
            source: SourceId::GitHub,
            url: repo.html_url,
        })
    }
}
