//! Retry policy for upstream HTTP calls.
//!
//! Only transient transport failures (timeouts, refused or reset
//! connections) are retried, and at most [`MAX_TRANSIENT_RETRIES`] times.
//! HTTP status responses are never retried.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::sync::{
    INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_TRANSIENT_RETRIES, ProgressCallback, SyncProgress,
};

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: MAX_TRANSIENT_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Never retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Execute an operation, retrying errors for which `is_retryable` holds.
///
/// Each retry emits [`SyncProgress::RetryBackoff`] and a debug log line.
///
/// # Arguments
///
/// * `operation` - The async operation to retry.
/// * `config` - Backoff bounds and retry budget.
/// * `is_retryable` - Which errors deserve another attempt.
/// * `short_message` - Short error text for logging.
/// * `target` - What is being fetched, for progress reporting.
/// * `on_progress` - Optional callback for reporting retries.
pub async fn with_retry<T, E, F, Fut, IsRetryable, ShortMsg>(
    mut operation: F,
    config: &RetryConfig,
    is_retryable: IsRetryable,
    short_message: ShortMsg,
    target: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
    IsRetryable: Fn(&E) -> bool + Send + Sync + 'static,
    ShortMsg: Fn(&E) -> String + Send + Sync + 'static,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.clone().into_backoff())
        .notify(|err, dur| {
            let current_attempt = attempt.load(Ordering::SeqCst);
            if let Some(cb) = on_progress {
                cb(SyncProgress::RetryBackoff {
                    url: target.to_string(),
                    retry_after_ms: dur.as_millis() as u64,
                    attempt: current_attempt,
                });
            }
            tracing::debug!(
                "Transient failure on {}, retrying in {:?} (attempt {}): {}",
                target,
                dur,
                current_attempt,
                short_message(err)
            );
        })
        .when(is_retryable)
        .await
}
