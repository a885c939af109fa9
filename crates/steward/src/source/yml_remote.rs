//! Remote descriptor adapter: a YAML file served over HTTP(S).
//!
//! ```yaml
//! my-repo:
//!   label: "The Example repository"
//!   description: "Demo repo"
//!   num_open_issues: 3
//! ```
//!
//! The first top-level key is the record key. An unreachable file is
//! reported as not found, never as a transport failure.

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml_ng::{Mapping, Value};

use super::uri::is_descriptor_uri;
use super::{
    CanonicalRecord, RepositorySource, Result, SourceError, SourceId, USER_AGENT, UpstreamClient,
};
use crate::http::HttpRequest;

#[derive(Debug, Deserialize)]
struct DescriptorEntry {
    label: String,
    #[serde(default)]
    description: Option<String>,
    num_open_issues: u32,
}

/// Adapter for descriptor files hosted anywhere.
#[derive(Clone)]
pub struct YmlRemoteSource {
    client: UpstreamClient,
}

impl YmlRemoteSource {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

/// Parse a descriptor document fetched from `uri`.
pub fn parse_descriptor(uri: &str, body: &[u8]) -> Result<CanonicalRecord> {
    let document: Mapping =
        serde_yaml_ng::from_slice(body).map_err(|e| SourceError::decode(uri, e))?;

    let (key, value) = document
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::decode(uri, "empty document"))?;

    let key = match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(SourceError::decode(
                uri,
                format!("top-level key is not a name: {:?}", other),
            ));
        }
    };

    let entry: DescriptorEntry =
        serde_yaml_ng::from_value(value).map_err(|e| SourceError::decode(uri, e))?;

    Ok(CanonicalRecord {
        key,
        label: entry.label,
        description: entry.description,
        open_issue_count: entry.num_open_issues,
        source: SourceId::Yml,
        url: uri.to_string(),
    })
}

#[async_trait]
impl RepositorySource for YmlRemoteSource {
    fn id(&self) -> SourceId {
        SourceId::Yml
    }

    fn validate(&self, uri: &str) -> bool {
        is_descriptor_uri(uri)
    }

    fn help_text(&self) -> String {
        r#"https://anything.anything/anything/anything.yml (or "http")"#.to_string()
    }

    async fn fetch_record(&self, uri: &str) -> Result<CanonicalRecord> {
        let request = HttpRequest::get(uri)
            .header("Accept", "application/yaml, text/yaml, text/plain, */*")
            .header("User-Agent", USER_AGENT);

        let response = match self.client.send(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::debug!(uri, status = response.status, "Descriptor not served");
                return Err(SourceError::not_found(uri));
            }
            Err(err) => {
                tracing::debug!(uri, error = %err, "Descriptor unreachable");
                return Err(SourceError::not_found(uri));
            }
        };

        parse_descriptor(uri, &response.body)
    }
}
