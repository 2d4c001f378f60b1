//! Bare-repository mirroring.
//!
//! [`RepoMirror`] is the seam the backup engine talks to; [`GitMirror`] is the
//! implementation that drives the `git` binary.

mod auth;
mod error;
mod git;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::credential::Credential;

pub use auth::{AuthenticatedUrl, authenticated_url};
pub use error::MirrorError;
pub use git::{DEFAULT_GIT_TIMEOUT, GitMirror, HEADS_REFSPEC};

/// Everything needed to create or refresh one mirror.
#[derive(Debug, Clone, Copy)]
pub struct MirrorRequest<'a> {
    /// Repository name; becomes the directory name.
    pub repo_name: &'a str,
    /// HTTPS clone URL as reported by the API.
    pub clone_url: &'a str,
    /// Directory the repository directory is created in.
    pub dest_parent: &'a Path,
    /// Login of the authenticated identity, used as the URL username.
    pub identity_login: &'a str,
    pub credential: &'a Credential,
}

/// Result of a successful mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOutcome {
    /// `dest_parent/repo_name`.
    pub path: PathBuf,
    /// True when the repository directory did not exist before.
    pub created: bool,
}

/// Creates or refreshes a mirror of one repository.
#[async_trait]
pub trait RepoMirror: Send + Sync {
    async fn mirror(&self, request: &MirrorRequest<'_>) -> Result<MirrorOutcome, MirrorError>;
}
