//! GitHub API error types.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The token was rejected (401/403 on the first request of a listing).
    #[error("Authentication failed (HTTP {status})")]
    AuthRequired { status: u16 },

    /// A listing page could not be fetched. Aborts only the current listing.
    #[error("Failed to fetch {url}: HTTP {status}")]
    TransientFetch { url: String, status: u16 },

    /// The request never produced a response (timeout, DNS, TLS, ...).
    #[error("Request failed: {0}")]
    Http(#[from] HttpError),

    /// The response body was not what the endpoint documents.
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl GitHubError {
    /// Create a decode error.
    #[inline]
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Check whether the credential itself was rejected.
    #[inline]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }
}
