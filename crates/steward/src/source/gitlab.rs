//! GitLab adapter: `https://gitlab.com/<namespace>/<project…>`.
//!
//! Nested groups are supported; the record key is the full
//! `path_with_namespace`.

use async_trait::async_trait;
use serde::Deserialize;

use super::uri::ForgeBase;
use super::{
    CanonicalRecord, GITLAB_HOST, RepositorySource, Result, SourceError, SourceId, USER_AGENT,
    UpstreamClient, count_pages,
};
use crate::http::HttpRequest;

const ISSUES_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct GitLabProject {
    path_with_namespace: String,
    name: String,
    description: Option<String>,
    web_url: String,
    #[serde(default)]
    issues_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GitLabIssue {
    state: String,
}

/// Adapter for projects on a GitLab instance.
#[derive(Clone)]
pub struct GitLabSource {
    client: UpstreamClient,
    host: ForgeBase,
    token: Option<String>,
}

impl GitLabSource {
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            host: ForgeBase::from_origin(GITLAB_HOST),
            token: None,
        }
    }

    /// Serve a self-managed instance instead of gitlab.com.
    pub fn with_host(mut self, host: &str) -> std::result::Result<Self, url::ParseError> {
        self.host = ForgeBase::parse(host)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    fn request(&self, url: String) -> HttpRequest {
        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => request.header("PRIVATE-TOKEN", token.as_str()),
            None => request,
        }
    }

    fn project_path(&self, uri: &str) -> Option<String> {
        let segments = self.host.repo_segments(uri)?;
        (segments.len() >= 2).then(|| segments.join("/"))
    }
}

#[async_trait]
impl RepositorySource for GitLabSource {
    fn id(&self) -> SourceId {
        SourceId::GitLab
    }

    fn validate(&self, uri: &str) -> bool {
        self.host.accepts(uri)
    }

    fn help_text(&self) -> String {
        format!("{}/<NAMESPACE>/<PROJECT_PATH>", self.host.as_str())
    }

    async fn fetch_record(&self, uri: &str) -> Result<CanonicalRecord> {
        let path = self.project_path(uri).ok_or_else(|| SourceError::unsupported(uri))?;
        let project_url = self
            .host
            .endpoint(["api", "v4", "projects", path.as_str()])
            .map_err(|_| SourceError::unsupported(uri))?;

        let (project, _): (GitLabProject, _) = self
            .client
            .get_json(self.request(project_url.to_string()))
            .await?;

        let open_issue_count = if project.issues_enabled == Some(false) {
            0
        } else {
            let mut issues_url = project_url.clone();
            issues_url
                .path_segments_mut()
                .map_err(|()| SourceError::unsupported(uri))?
                .push("issues");
            issues_url.set_query(Some(&format!("per_page={}", ISSUES_PAGE_SIZE)));
            let first = self.request(issues_url.to_string());
            count_pages::<GitLabIssue, _>(&self.client, first, |issue| issue.state == "opened")
                .await?
        };

        Ok(CanonicalRecord {
            key: project.path_with_namespace,
            label: project.name,
            description: project.description,
            open_issue_count,
            source: SourceId::GitLab,
            url: project.web_url,
        })
    }
}
