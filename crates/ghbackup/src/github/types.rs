//! Wire records returned by the GitHub REST API.
//!
//! Only the fields the backup needs are modelled; everything else in the
//! payload is ignored.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::GitHubError;

/// Page size requested from listing endpoints.
pub const PER_PAGE: u32 = 100;

/// A user or organization account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub login: String,
}

/// A repository record from any of the repository listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    pub clone_url: String,
    pub owner: Account,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl RepoRecord {
    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

/// Split a listing page into its records, decoding each one independently.
///
/// The page itself must be a JSON array; a malformed record only fails its
/// own slot so the rest of the page can still be processed.
pub fn decode_page<T: DeserializeOwned>(
    url: &str,
    page: serde_json::Value,
) -> Result<Vec<Result<T, serde_json::Error>>, GitHubError> {
    match page {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect()),
        other => Err(GitHubError::decode(
            url,
            format!("expected a JSON array, got {}", json_kind(&other)),
        )),
    }
}

/// Take the first record of a page.
///
/// Single-object endpoints such as `/user` return the record itself; listing
/// endpoints return an array whose first element is used.
pub fn first_record<T: DeserializeOwned>(
    url: &str,
    page: serde_json::Value,
) -> Result<T, GitHubError> {
    let record = match page {
        serde_json::Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| GitHubError::decode(url, "empty page"))?,
        other => other,
    };
    serde_json::from_value(record).map_err(|e| GitHubError::decode(url, e.to_string()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
