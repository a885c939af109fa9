//! Transport boundary for all upstream HTTP I/O.
//!
//! Adapters build [`HttpRequest`]s and hand them to an [`HttpTransport`]. The
//! production transport is reqwest-backed with a per-request timeout; tests
//! use [`MockTransport`] and never open sockets.

use async_trait::async_trait;
use thiserror::Error;

/// HTTP methods the adapters issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
        }
    }
}

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
}

impl HttpRequest {
    /// A GET request with no headers.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

impl HttpError {
    /// Timeouts and connection failures may succeed on a second attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Timeout(_) | HttpError::Connection(_))
    }
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(any(feature = "github", feature = "gitlab", feature = "yml"))]
pub mod reqwest_transport {
    use super::*;

    use std::time::Duration as StdDuration;

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        pub fn with_timeout(timeout: StdDuration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout)
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    fn classify(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::Connection(err.to_string())
        } else {
            HttpError::Transport(err.to_string())
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
            };

            let mut builder = self.client.request(method, &request.url);
            for (k, v) in request.headers {
                builder = builder.header(&k, &v);
            }

            let resp = builder.send().await.map_err(classify)?;

            let status = resp.status().as_u16();
            let headers: HttpHeaders = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            let body = resp.bytes().await.map_err(classify)?.to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory mock transport.
///
/// Responses and errors are queued per method + URL and replayed in FIFO order.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<(HttpMethod, String), VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for a method + URL.
    pub fn push_response(&self, method: HttpMethod, url: impl Into<String>, response: HttpResponse) {
        self.push(method, url.into(), Ok(response));
    }

    /// Register a JSON body with the given status for a GET.
    pub fn push_json(&self, url: impl Into<String>, status: u16, body: serde_json::Value) {
        self.push_response(
            HttpMethod::Get,
            url,
            HttpResponse {
                status,
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: body.to_string().into_bytes(),
            },
        );
    }

    /// Register a plain-text body with the given status for a GET.
    pub fn push_text(&self, url: impl Into<String>, status: u16, body: &str) {
        self.push_response(
            HttpMethod::Get,
            url,
            HttpResponse {
                status,
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            },
        );
    }

    /// Register a transport failure for a method + URL.
    pub fn push_error(&self, method: HttpMethod, url: impl Into<String>, error: HttpError) {
        self.push(method, url.into(), Err(error));
    }

    fn push(&self, method: HttpMethod, url: String, entry: Result<HttpResponse, HttpError>) {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.routes.entry((method, url)).or_default().push_back(entry);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        let inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.requests.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");

        let key = (request.method, request.url.clone());
        inner.requests.push(request);

        match inner.routes.get_mut(&key).and_then(|q| q.pop_front()) {
            Some(entry) => entry,
            None => Err(HttpError::NoMockResponse {
                method: key.0.as_str().to_string(),
                url: key.1,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("Link".to_string(), "<a>".to_string()),
            ("link".to_string(), "<b>".to_string()),
        ];
        assert_eq!(header_get(&headers, "LINK"), Some("<a>"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn request_builder_appends_headers() {
        let req = HttpRequest::get("https://example.com").header("Accept", "text/yaml");
        assert_eq!(req.method.as_str(), "GET");
        assert_eq!(header_get(&req.headers, "accept"), Some("text/yaml"));
    }

    #[test]
    fn only_timeouts_and_connection_failures_are_transient() {
        assert!(HttpError::Timeout("t".into()).is_transient());
        assert!(HttpError::Connection("c".into()).is_transient());
        assert!(!HttpError::Transport("x".into()).is_transient());
        assert!(
            !HttpError::NoMockResponse {
                method: "GET".into(),
                url: "u".into()
            }
            .is_transient()
        );
    }

    #[tokio::test]
    async fn mock_transport_replays_responses_and_errors_in_order() {
        let transport = MockTransport::new();
        let url = "https://example.com/api";
        transport.push_error(HttpMethod::Get, url, HttpError::Timeout("slow".into()));
        transport.push_text(url, 200, "hello");

        let err = transport
            .send(HttpRequest::get(url))
            .await
            .expect_err("first call should fail");
        assert!(err.is_transient());

        let resp = transport
            .send(HttpRequest::get(url))
            .await
            .expect("second call should succeed");
        assert!(resp.is_success());
        assert_eq!(resp.body, b"hello".to_vec());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn mock_transport_errors_when_no_response_is_registered() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest::get("https://example.com/missing"))
            .await
            .expect_err("missing mock should error");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "GET");
                assert_eq!(url, "https://example.com/missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    #[cfg(any(feature = "github", feature = "gitlab", feature = "yml"))]
    async fn reqwest_transport_reports_connection_failures_as_transient() {
        use std::time::Duration;

        // Bind then drop a listener so the port is closed.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("local addr")
        };
        let transport = reqwest_transport::ReqwestTransport::with_timeout(Duration::from_secs(2))
            .expect("reqwest transport should build");

        let err = transport
            .send(HttpRequest::get(format!("http://{addr}/repo.yml")))
            .await
            .expect_err("closed port should fail");
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    #[cfg(any(feature = "github", feature = "gitlab", feature = "yml"))]
    async fn reqwest_transport_send_returns_transport_error_for_invalid_url() {
        let transport = reqwest_transport::ReqwestTransport::new(reqwest::Client::new());
        let err = transport
            .send(HttpRequest::get("not a url"))
            .await
            .expect_err("expected error");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
