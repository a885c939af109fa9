//! Shared request path for every adapter: pacing, retry, status mapping.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::retry::{RetryConfig, with_retry};
use crate::sync::ProgressCallback;

use super::errors::{Result, SourceError};
use super::rate_limit::ApiRateLimiter;

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = concat!("steward/", env!("CARGO_PKG_VERSION"));

/// Upper bound on pages walked when counting issues. A listing that still
/// links onward after this many pages is an error, not a partial count.
pub const MAX_PAGES: usize = 100;

/// Transport plus the policies every adapter applies to it.
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Option<ApiRateLimiter>,
    retry: RetryConfig,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            rate_limiter: None,
            retry: RetryConfig::default(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Report retry backoffs through `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Send a request, waiting on the limiter before every attempt and
    /// retrying transient transport failures.
    pub async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, HttpError> {
        let target = request.url.clone();
        with_retry(
            || {
                let request = request.clone();
                async move {
                    if let Some(limiter) = &self.rate_limiter {
                        limiter.wait().await;
                    }
                    self.transport.send(request).await
                }
            },
            &self.retry,
            HttpError::is_transient,
            |e: &HttpError| e.to_string(),
            &target,
            self.on_progress.as_deref(),
        )
        .await
    }

    /// Send a request and require a 2xx status.
    pub async fn send_ok(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(SourceError::from_status(response.status, url));
        }
        Ok(response)
    }

    /// Send a request, require a 2xx status and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<(T, HttpResponse)> {
        let url = request.url.clone();
        let response = self.send_ok(request).await?;
        let parsed = serde_json::from_slice(&response.body)
            .map_err(|e| SourceError::decode(&url, e))?;
        Ok((parsed, response))
    }
}

/// The `rel="next"` target of an RFC 8288 `Link` header.
pub fn next_link(response: &HttpResponse) -> Option<String> {
    let header = response.header("link")?;
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Walk a paginated JSON list, folding each page with `count`.
pub async fn count_pages<T, F>(client: &UpstreamClient, first: HttpRequest, count: F) -> Result<u32>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let resource = first.url.clone();
    let mut total = 0u32;
    let mut request = Some(first);
    let mut pages = 0usize;

    while let Some(current) = request.take() {
        let headers = current.headers.clone();
        let (items, response): (Vec<T>, HttpResponse) = client.get_json(current).await?;
        total = total.saturating_add(items.iter().filter(|item| count(*item)).count() as u32);
        pages += 1;

        let Some(url) = next_link(&response) else {
            break;
        };
        if pages >= MAX_PAGES {
            tracing::warn!(resource = %resource, "Listing exceeds {} pages", MAX_PAGES);
            return Err(SourceError::TooManyPages {
                resource,
                pages: MAX_PAGES,
            });
        }

        request = Some(HttpRequest {
            method: HttpMethod::Get,
            url,
            headers,
        });
    }

    Ok(total)
}
