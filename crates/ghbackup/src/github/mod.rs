//! GitHub API access for discovery.
//!
//! # Module Structure
//!
//! - `error` - Error types for GitHub API operations
//! - `types` - Wire records (accounts, repositories) and page decoding
//! - `client` - Authenticated client and endpoint URLs
//! - `pagination` - Forward-only cursor over `rel="next"` links
//!
//! ```ignore
//! use ghbackup::github::{ClientOptions, GitHubClient};
//!
//! let client = GitHubClient::new(credential, ClientOptions::default())?;
//! let me = client.current_user().await?;
//! let mut pages = client.user_repos();
//! while let Some(page) = pages.next_page().await {
//!     let page = page?;
//! }
//! ```

mod client;
mod error;
mod pagination;
mod types;

pub use client::{
    ClientOptions, DEFAULT_API_TIMEOUT, DEFAULT_API_URL, DEFAULT_ARCHIVE_TIMEOUT, GitHubClient,
    LinkPagination, parse_link_header,
};
pub use error::GitHubError;
pub use pagination::Paginator;
pub use types::{Account, PER_PAGE, RepoRecord, decode_page, first_record};
