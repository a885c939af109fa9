use thiserror::Error;

use crate::http::HttpError;

/// Errors an adapter can hit while fetching one reference.
///
/// These never leave the adapter boundary: [`super::RepositorySource::fetch`]
/// folds them into a [`FetchFailure`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// Upstream has nothing at this address.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Authentication required or rejected.
    #[error("Authentication failed ({status}) for {resource}")]
    Auth { status: u16, resource: String },

    /// Any other non-success status.
    #[error("API error ({status}) for {resource}")]
    Api { status: u16, resource: String },

    /// Network failure, after retries.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Upstream body did not have the expected shape.
    #[error("Malformed response from {resource}: {message}")]
    Decode { resource: String, message: String },

    /// The adapter was handed a URL it does not accept.
    #[error("Unsupported URL: {uri}")]
    Unsupported { uri: String },

    /// Pagination kept going past the page limit.
    #[error("More than {pages} pages at {resource}")]
    TooManyPages { resource: String, pages: usize },
}

impl SourceError {
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn decode(resource: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    #[inline]
    pub fn unsupported(uri: impl Into<String>) -> Self {
        Self::Unsupported { uri: uri.into() }
    }

    /// Map a non-success status onto the error taxonomy.
    pub fn from_status(status: u16, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        match status {
            404 | 410 => Self::NotFound { resource },
            401 | 403 => Self::Auth { status, resource },
            _ => Self::Api { status, resource },
        }
    }

    /// Which bucket this error is reported under.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } | Self::Unsupported { .. } => FailureKind::NotFound,
            Self::Auth { .. } | Self::Api { .. } | Self::Http(_) => FailureKind::Transport,
            Self::Decode { .. } | Self::TooManyPages { .. } => FailureKind::Decode,
        }
    }
}

/// Coarse classification of an empty fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    Transport,
    Decode,
}

/// Why a fetch produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    /// First line of the underlying error, for logs only.
    pub detail: String,
}

impl From<&SourceError> for FetchFailure {
    fn from(err: &SourceError) -> Self {
        Self {
            kind: err.kind(),
            detail: short_error_message(err),
        }
    }
}

/// First line of an error message, for progress reporting and logging.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, SourceError>;
