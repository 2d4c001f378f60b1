//! Access tokens.
//!
//! A [`Credential`] wraps a bearer token so that it cannot end up in a log
//! line or an error message by accident: `Debug` and `Display` only ever show
//! the last four characters.

use std::fmt;
use std::sync::Arc;

/// An opaque bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wrap a raw token. Surrounding whitespace is trimmed.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref().trim()))
    }

    /// The raw token. Only for building request headers and remote URLs.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The last four characters, for telling tokens apart in logs.
    #[must_use]
    pub fn suffix(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &self.0[start..]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(…{})", self.suffix())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "…{}", self.suffix())
    }
}
