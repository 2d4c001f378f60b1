//! Credential injection into clone URLs.
//!
//! This is the only place a token is combined with a URL. The result is an
//! [`AuthenticatedUrl`] whose `Debug` and `Display` mask the password, so it
//! can sit in structs and error contexts without leaking.

use std::fmt;

use url::Url;

use super::error::MirrorError;
use crate::credential::Credential;

const MASK: &str = "***";

/// A clone URL carrying `login:token` userinfo.
#[derive(Clone)]
pub struct AuthenticatedUrl {
    url: Url,
}

impl AuthenticatedUrl {
    /// The full URL including the token. Only for handing to `git` argv.
    pub(crate) fn expose(&self) -> &str {
        self.url.as_str()
    }

    fn redacted(&self) -> String {
        let mut shown = self.url.clone();
        if shown.password().is_some() {
            // Cannot fail: the URL already carries userinfo.
            let _ = shown.set_password(Some(MASK));
        }
        shown.to_string()
    }
}

impl fmt::Debug for AuthenticatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthenticatedUrl")
            .field(&self.redacted())
            .finish()
    }
}

impl fmt::Display for AuthenticatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Put `login:token` into the authority of an http(s) clone URL.
///
/// Any userinfo already present in `clone_url` is replaced.
pub fn authenticated_url(
    clone_url: &str,
    login: &str,
    credential: &Credential,
) -> Result<AuthenticatedUrl, MirrorError> {
    let mut url =
        Url::parse(clone_url).map_err(|e| MirrorError::invalid_clone_url(clone_url, e.to_string()))?;

    if !matches!(url.scheme(), "https" | "http") {
        return Err(MirrorError::invalid_clone_url(
            clone_url,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    url.set_username(login)
        .and_then(|()| url.set_password(Some(credential.expose())))
        .map_err(|()| MirrorError::invalid_clone_url(clone_url, "URL cannot carry credentials"))?;

    Ok(AuthenticatedUrl { url })
}

/// Replace every occurrence of the token in `text` (e.g. captured git stderr).
pub(crate) fn scrub(text: &str, credential: &Credential) -> String {
    let token = credential.expose();
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, MASK)
}
