use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::entity::source_id::SourceId;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default pacing per source (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour for tokens, 60/hour anonymous; bursts of 10/sec.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// GitLab: 2000 requests/minute, we use 5/sec for safety.
    pub const GITLAB_DEFAULT_RPS: u32 = 5;
    /// Descriptor files live on arbitrary hosts.
    pub const YML_DEFAULT_RPS: u32 = 10;
}

/// Default pacing for a source.
pub fn default_rps_for_source(source: SourceId) -> u32 {
    match source {
        SourceId::GitHub => rate_limits::GITHUB_DEFAULT_RPS,
        SourceId::GitLab => rate_limits::GITLAB_DEFAULT_RPS,
        SourceId::Yml => rate_limits::YML_DEFAULT_RPS,
    }
}

/// Proactive request pacing shared by every clone.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(rate_limits::GITHUB_DEFAULT_RPS);
/// limiter.wait().await;
/// transport.send(request).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// A limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// A limiter with the default pacing for `source`.
    pub fn for_source(source: SourceId) -> Self {
        Self::new(default_rps_for_source(source))
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_rps_per_source() {
        assert_eq!(default_rps_for_source(SourceId::GitHub), 10);
        assert_eq!(default_rps_for_source(SourceId::GitLab), 5);
        assert_eq!(default_rps_for_source(SourceId::Yml), 10);
    }

    #[tokio::test]
    async fn test_zero_rps_still_admits_requests() {
        let limiter = ApiRateLimiter::new(0);
        tokio::time::timeout(Duration::from_secs(2), limiter.wait())
            .await
            .expect("first request should be admitted");
    }

    #[tokio::test]
    async fn test_clones_share_one_quota() {
        let limiter = ApiRateLimiter::new(5);
        let clone = limiter.clone();
        tokio::time::timeout(Duration::from_millis(100), async {
            for _ in 0..3 {
                limiter.wait().await;
                clone.wait().await;
            }
        })
        .await
        .expect_err("six requests should exceed a shared burst of five");
    }
}
