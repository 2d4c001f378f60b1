//! Cursor-following pagination over GitHub listing endpoints.
//!
//! A [`Paginator`] fetches one page per call and follows the `rel="next"`
//! link of each response. It is forward-only: once the last page has been
//! yielded, or a page has failed, it yields nothing more.

use futures::Stream;

use super::client::{GitHubClient, parse_link_header};
use super::error::GitHubError;

/// Lazy, forward-only sequence of JSON pages.
pub struct Paginator<'a> {
    client: &'a GitHubClient,
    next_url: Option<String>,
    pages_fetched: u32,
}

impl<'a> Paginator<'a> {
    pub(crate) fn new(client: &'a GitHubClient, url: String) -> Self {
        Self {
            client,
            next_url: Some(url),
            pages_fetched: 0,
        }
    }

    /// Number of pages successfully fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Whether another call to [`next_page`](Self::next_page) may yield a page.
    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }

    /// Fetch the next page.
    ///
    /// Returns `None` when the previous page carried no continuation link.
    /// A 401/403 on the first request is an [`GitHubError::AuthRequired`];
    /// any other non-2xx status is a [`GitHubError::TransientFetch`]. After an
    /// error the cursor is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<serde_json::Value, GitHubError>> {
        let url = self.next_url.take()?;
        let is_first = self.pages_fetched == 0;

        let resp = match self.client.get(&url).await {
            Ok(resp) => resp,
            Err(e) => return Some(Err(e)),
        };

        if let Err(e) = check_status(&url, resp.status, is_first) {
            return Some(Err(e));
        }

        let page = match serde_json::from_slice::<serde_json::Value>(&resp.body) {
            Ok(page) => page,
            Err(e) => return Some(Err(GitHubError::decode(&url, e.to_string()))),
        };

        self.pages_fetched += 1;
        self.next_url = resp.header("link").and_then(|h| parse_link_header(h).next);

        tracing::debug!(
            url = %url,
            page = self.pages_fetched,
            has_next = self.next_url.is_some(),
            "Fetched page"
        );

        Some(Ok(page))
    }

    /// Adapt into a [`Stream`] of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<serde_json::Value, GitHubError>> + 'a {
        futures::stream::unfold(self, |mut pages| async move {
            pages.next_page().await.map(|page| (page, pages))
        })
    }

    /// Drain every page, stopping at the first error.
    pub async fn collect_pages(mut self) -> Result<Vec<serde_json::Value>, GitHubError> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await {
            pages.push(page?);
        }
        Ok(pages)
    }
}

/// Map a response status onto the pagination error taxonomy.
fn check_status(url: &str, status: u16, is_first: bool) -> Result<(), GitHubError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 if is_first => Err(GitHubError::AuthRequired { status }),
        _ => Err(GitHubError::TransientFetch {
            url: url.to_string(),
            status,
        }),
    }
}

impl GitHubClient {
    /// Start paginating from an absolute URL.
    pub fn paginate(&self, url: impl Into<String>) -> Paginator<'_> {
        Paginator::new(self, url.into())
    }
}
