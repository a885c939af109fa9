//! Cross-account uniqueness of upstream URLs.

use crate::store::{RecordStore, StoreError};

/// Whether `url` is free for `candidate_owner_id`: no record owned by a
/// different account points at it.
///
/// This is a point-in-time read. The database store backs it with a unique
/// index, so a racing writer still fails at write time.
pub async fn is_unique(
    store: &dyn RecordStore,
    url: &str,
    candidate_owner_id: i64,
) -> Result<bool, StoreError> {
    let holders = store.find_by_url(url).await?;
    Ok(holders.iter().all(|r| r.owner_id == candidate_owner_id))
}
