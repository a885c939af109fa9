//! Inline feedback for a profile's reference list before it is saved.

use crate::registry::{RegistryError, SourceRegistry};
use crate::source::FetchOutcome;
use crate::store::{RecordStore, StoreError};

use super::guard;
use super::types::ReferenceError;

/// Check each reference the way a pass would, without writing anything.
///
/// Returns one human-readable message per problem, in reference order.
/// An empty registry yields a single configuration message.
pub async fn validate_references(
    registry: &SourceRegistry,
    store: &dyn RecordStore,
    owner_id: i64,
    uris: &[String],
) -> Result<Vec<String>, StoreError> {
    if registry.is_empty() {
        return Ok(vec![RegistryError::NoSourcesEnabled.to_string()]);
    }

    let mut messages = Vec::new();
    for uri in uris.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
        let Some(source) = registry.sources().iter().find(|s| s.validate(uri)) else {
            messages.push(ReferenceError::validation(uri).message);
            continue;
        };

        match source.fetch(uri).await {
            FetchOutcome::Found(record) => {
                if !guard::is_unique(store, &record.url, owner_id).await? {
                    messages.push(ReferenceError::uniqueness(uri).message);
                }
            }
            FetchOutcome::Empty(_) => messages.push(ReferenceError::not_found(uri).message),
        }
    }

    Ok(messages)
}
