//! Canonical repository shape shared by every adapter.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entity::source_id::SourceId;

/// Normalized repository metadata produced by an adapter.
///
/// A fresh value is built on every reconciliation pass; it is never mutated
/// into a new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Stable machine name within the source, e.g. `owner/name`.
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub open_issue_count: u32,
    pub source: SourceId,
    /// Canonical upstream URL.
    pub url: String,
}

impl CanonicalRecord {
    /// Digest used as the sole change-detection signal.
    ///
    /// SHA-256, lowercase hex, over the compact JSON array
    /// `[key, label, description|null, open_issue_count, source, url]`.
    /// Stored hashes depend on this field order.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let canonical = serde_json::json!([
            self.key,
            self.label,
            self.description,
            self.open_issue_count,
            self.source.as_str(),
            self.url,
        ]);
        hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
    }
}
