//! URL shape checks and path extraction. No network access.
//!
//! Shapes are matched against the raw string, so scheme and host are
//! case-sensitive. Once a shape is accepted the URL is handled through
//! [`Url`].

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// What may follow a forge origin: `/<namespace>/<path…>`.
static FORGE_PATH: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^/[a-zA-Z0-9_\-/]+/[a-zA-Z0-9_\-/]+$"));

/// `http(s)://<host>/<path>.yml` or `.yaml`.
static DESCRIPTOR: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9.\-]+/[a-zA-Z0-9_\-.%/]+\.ya?ml$")
});

fn is_match(pattern: &Result<Regex, regex::Error>, haystack: &str) -> bool {
    match pattern {
        Ok(regex) => regex.is_match(haystack),
        Err(err) => {
            tracing::error!(error = %err, "Invalid URL pattern");
            false
        }
    }
}

fn path_segments(url: &Url) -> impl Iterator<Item = &str> {
    url.path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
}

/// Whether `uri` points at a remote YAML descriptor.
pub fn is_descriptor_uri(uri: &str) -> bool {
    is_match(&DESCRIPTOR, uri) && Url::parse(uri).is_ok()
}

/// Web origin of a forge, e.g. `https://github.com` or a self-managed
/// GitLab, always without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeBase {
    origin: String,
}

impl ForgeBase {
    /// Wrap an origin that is already in the form [`ForgeBase::parse`]
    /// produces.
    pub fn from_origin(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Parse a configured host. A bare host name gets `https://`.
    pub fn parse(host: &str) -> Result<Self, url::ParseError> {
        let host = host.trim().trim_end_matches('/');
        let mut url = match Url::parse(host) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => Url::parse(&format!("https://{}", host))?,
        };
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self::from_origin(url.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.origin
    }

    /// Whether `uri` is `<origin>/<namespace>/<path…>`.
    pub fn accepts(&self, uri: &str) -> bool {
        uri.strip_prefix(self.origin.as_str())
            .is_some_and(|rest| is_match(&FORGE_PATH, rest))
    }

    /// Repository path segments of an accepted `uri`, relative to the
    /// origin and cut at the first `-` marker (`/-/issues`, `/-/tree/main`).
    pub fn repo_segments(&self, uri: &str) -> Option<Vec<String>> {
        if !self.accepts(uri) {
            return None;
        }
        let base = Url::parse(&self.origin).ok()?;
        let url = Url::parse(uri).ok()?;

        let depth = path_segments(&base).count();
        let mut segments: Vec<String> = path_segments(&url)
            .skip(depth)
            .map(str::to_string)
            .collect();
        if let Some(index) = segments.iter().position(|s| s == "-") {
            segments.truncate(index);
        }
        Some(segments)
    }

    /// `<origin>/<segments…>`, each segment percent-encoded on its own so
    /// a `/` inside one becomes `%2F`.
    pub fn endpoint<I>(&self, segments: I) -> Result<Url, url::ParseError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = Url::parse(&self.origin)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| url::ParseError::RelativeUrlWithoutBase)?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{GITHUB_WEB_URL, GITLAB_HOST};

    fn github() -> ForgeBase {
        ForgeBase::from_origin(GITHUB_WEB_URL)
    }

    #[test]
    fn test_patterns_compile() {
        assert!(FORGE_PATH.is_ok());
        assert!(DESCRIPTOR.is_ok());
    }

    #[test]
    fn test_accepts_owner_and_repo() {
        assert!(github().accepts("https://github.com/rust-lang/rust"));
        assert!(github().accepts("https://github.com/some_org/some-repo/tree"));
    }

    #[test]
    fn test_rejects_other_shapes() {
        let rejected = [
            "https://github.com/rust-lang",
            "https://github.com/rust-lang/",
            "https://github.com//rust",
            "https://github.com/",
            "http://github.com/rust-lang/rust",
            "https://GitHub.com/rust-lang/rust",
            "https://github.com.evil.io/rust-lang/rust",
            "https://github.com/rust-lang/rust.git",
            "https://github.com/rust-lang/rust?tab=readme",
            "https://github.com/rust lang/rust",
        ];
        for uri in rejected {
            assert!(!github().accepts(uri), "{uri} should be rejected");
            assert_eq!(github().repo_segments(uri), None, "{uri}");
        }
    }

    #[test]
    fn test_repo_segments_stops_at_dash_marker() {
        let gitlab = ForgeBase::from_origin(GITLAB_HOST);
        assert_eq!(
            gitlab.repo_segments("https://gitlab.com/group/sub/project/-/issues"),
            Some(vec!["group".to_string(), "sub".to_string(), "project".to_string()])
        );
        assert_eq!(
            github().repo_segments("https://github.com/owner//repo/"),
            Some(vec!["owner".to_string(), "repo".to_string()])
        );
    }

    #[test]
    fn test_repo_segments_are_relative_to_base_path() {
        let base = ForgeBase::parse("https://example.org/gitlab/").expect("valid host");
        assert_eq!(base.as_str(), "https://example.org/gitlab");
        assert_eq!(
            base.repo_segments("https://example.org/gitlab/team/app"),
            Some(vec!["team".to_string(), "app".to_string()])
        );
    }

    #[test]
    fn test_descriptor_uris() {
        let cases = [
            ("https://www.mysite.com/some%20directory/anything.yml", true),
            ("/var/www/html/anything.yaml", false),
            ("https://dev.www.mysite.com/some directory/anything.yml", false),
            ("https://localhost/some%20directory/anything.yaml", true),
            ("http://example.com/repo.yml", true),
            ("https://example.com/.yml", false),
            ("https://example.com/repo.yml?raw=1", false),
            ("https://example.com/repo.json", false),
            ("ftp://example.com/repo.yml", false),
            ("HTTPS://example.com/repo.yml", false),
            ("https:///repo.yml", false),
        ];
        for (uri, expected) in cases {
            assert_eq!(is_descriptor_uri(uri), expected, "{uri}");
        }
    }

    #[test]
    fn test_parse_normalizes_host() {
        let parse = |host: &str| ForgeBase::parse(host).map(|base| base.as_str().to_string());
        assert_eq!(parse("gitlab.com"), Ok("https://gitlab.com".to_string()));
        assert_eq!(
            parse(" https://gitlab.example.org/ "),
            Ok("https://gitlab.example.org".to_string())
        );
        assert_eq!(
            parse("http://localhost:8080"),
            Ok("http://localhost:8080".to_string())
        );
        assert_eq!(parse("localhost:8080"), Ok("https://localhost:8080".to_string()));
        assert!(parse("not a host").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_default_origins_are_canonical() {
        for origin in [GITHUB_WEB_URL, GITLAB_HOST] {
            assert_eq!(ForgeBase::parse(origin), Ok(ForgeBase::from_origin(origin)));
        }
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let url = ForgeBase::from_origin(GITLAB_HOST)
            .endpoint(["api", "v4", "projects", "group/sub/project"])
            .expect("valid origin");
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fproject"
        );
    }
}
