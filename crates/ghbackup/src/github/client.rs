//! GitHub API client and endpoint helpers.

use std::sync::Arc;
use std::time::Duration;

use super::error::GitHubError;
use super::pagination::Paginator;
use super::types::{Account, PER_PAGE, first_record};
use crate::credential::Credential;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, StreamingResponse};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Timeout for metadata (listing) requests.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for archive downloads, which can be large.
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(600);

/// Links extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The rel="next" URL.
    pub next: Option<String>,
    /// The rel="last" URL.
    pub last: Option<String>,
}

/// Extract the `next` and `last` targets from a Link header such as
/// `<https://api.github.com/user/repos?page=2>; rel="next", <...?page=3>; rel="last"`.
///
/// Entries that do not parse are ignored.
pub fn parse_link_header(header: &str) -> LinkPagination {
    let mut links = LinkPagination::default();

    for entry in header.split(',') {
        let mut params = entry.split(';').map(str::trim);
        let Some(target) = params
            .next()
            .and_then(|t| t.strip_prefix('<'))
            .and_then(|t| t.strip_suffix('>'))
        else {
            continue;
        };
        let rel = params.find_map(|p| p.strip_prefix("rel=")).map(|r| r.trim_matches('"'));

        match rel {
            Some("next") => links.next = Some(target.to_string()),
            Some("last") => links.last = Some(target.to_string()),
            _ => {}
        }
    }

    links
}

/// Client construction options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root, without a trailing slash.
    pub api_url: String,
    /// Timeout for listing requests.
    pub api_timeout: Duration,
    /// Timeout for archive downloads.
    pub archive_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: DEFAULT_API_TIMEOUT,
            archive_timeout: DEFAULT_ARCHIVE_TIMEOUT,
        }
    }
}

/// GitHub API client bound to one credential.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    credential: Credential,
    api_url: Arc<str>,
    api_timeout: Duration,
    archive_timeout: Duration,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    pub fn new(credential: Credential, options: ClientOptions) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(options.api_timeout)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            credential,
            options,
        ))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        credential: Credential,
        options: ClientOptions,
    ) -> Self {
        Self {
            transport,
            credential,
            api_url: Arc::from(options.api_url.trim_end_matches('/')),
            api_timeout: options.api_timeout,
            archive_timeout: options.archive_timeout,
        }
    }

    /// The credential this client authenticates with.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The API root URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Accept", "application/vnd.github+json")
            .header(
                "Authorization",
                format!("token {}", self.credential.expose()),
            )
    }

    /// Authenticated GET with the metadata timeout.
    pub(crate) async fn get(&self, url: &str) -> Result<HttpResponse, GitHubError> {
        let request = self.authorized(HttpRequest::get(url).timeout(self.api_timeout));
        Ok(self.transport.send(request).await?)
    }

    /// Authenticated streamed GET with the archive timeout.
    pub(crate) async fn get_streaming(&self, url: &str) -> Result<StreamingResponse, GitHubError> {
        let request = self.authorized(HttpRequest::get(url).timeout(self.archive_timeout));
        Ok(self.transport.send_streaming(request).await?)
    }

    /// `GET /user`
    pub fn current_user_url(&self) -> String {
        format!("{}/user", self.api_url)
    }

    /// `GET /user/orgs`
    pub fn user_orgs_url(&self) -> String {
        format!("{}/user/orgs?per_page={PER_PAGE}", self.api_url)
    }

    /// `GET /orgs/{org}/repos`
    pub fn org_repos_url(&self, org: &str) -> String {
        format!("{}/orgs/{org}/repos?per_page={PER_PAGE}", self.api_url)
    }

    /// `GET /user/repos`: every repository the identity can see (owned,
    /// collaborator and organization member).
    pub fn user_repos_url(&self) -> String {
        format!("{}/user/repos?per_page={PER_PAGE}", self.api_url)
    }

    /// `GET /repos/{owner}/{repo}/zipball`: archive of the default branch.
    pub fn archive_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/zipball", self.api_url)
    }

    /// Resolve the account that owns the credential.
    ///
    /// Takes the first record of the first page of `/user`.
    pub async fn current_user(&self) -> Result<Account, GitHubError> {
        let url = self.current_user_url();
        let mut pages = self.paginate(url.clone());
        match pages.next_page().await {
            Some(page) => first_record(&url, page?),
            None => Err(GitHubError::decode(url, "no page returned")),
        }
    }

    /// Pages of organizations the identity belongs to.
    pub fn user_orgs(&self) -> Paginator<'_> {
        self.paginate(self.user_orgs_url())
    }

    /// Pages of an organization's repositories.
    pub fn org_repos(&self, org: &str) -> Paginator<'_> {
        self.paginate(self.org_repos_url(org))
    }

    /// Pages of every repository visible to the identity.
    pub fn user_repos(&self) -> Paginator<'_> {
        self.paginate(self.user_repos_url())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}
