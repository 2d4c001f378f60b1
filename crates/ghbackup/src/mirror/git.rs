//! Mirror engine backed by the `git` command-line tool.
//!
//! Each repository is a bare repository updated with
//! `git fetch --force --prune --tags <url> refs/heads/*:refs/heads/*`. The
//! authenticated URL is passed as a one-shot remote, so no remote is ever
//! configured and the token is never written below the repository.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::auth::{authenticated_url, scrub};
use super::error::MirrorError;
use super::{MirrorOutcome, MirrorRequest, RepoMirror};
use crate::credential::Credential;
use crate::fs::{DirOptions, ensure_dir};
use crate::names;

/// Default timeout for a single fetch.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Timeout for local-only git commands such as `init`.
const LOCAL_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Refspec mapping every remote branch onto the same local branch.
pub const HEADS_REFSPEC: &str = "refs/heads/*:refs/heads/*";

/// Mirror engine that shells out to `git`.
#[derive(Debug, Clone)]
pub struct GitMirror {
    git: PathBuf,
    timeout: Duration,
    dir_options: DirOptions,
    config: Vec<(String, String)>,
}

impl GitMirror {
    /// Create an engine with an explicit git binary.
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self {
            git: git.into(),
            timeout: DEFAULT_GIT_TIMEOUT,
            dir_options: DirOptions::default(),
            config: Vec::new(),
        }
    }

    /// Find `git` on `PATH`.
    pub fn from_path() -> Result<Self, MirrorError> {
        which::which("git")
            .map(Self::new)
            .map_err(|e| MirrorError::GitNotFound(e.to_string()))
    }

    /// Set the fetch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the options used when creating repository directories.
    #[must_use]
    pub fn with_dir_options(mut self, dir_options: DirOptions) -> Self {
        self.dir_options = dir_options;
        self
    }

    /// Add a `-c key=value` setting to every git invocation.
    #[must_use]
    pub fn with_git_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    /// The git binary in use.
    pub fn git(&self) -> &Path {
        &self.git
    }

    fn command(&self, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.config {
            cmd.arg("-c").arg(format!("{key}={value}"));
        }
        cmd
    }

    async fn run(
        &self,
        command: &'static str,
        mut cmd: Command,
        timeout: Duration,
        credential: Option<&Credential>,
    ) -> Result<Output, MirrorError> {
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| MirrorError::Spawn { command, source })?,
            Err(_) => return Err(MirrorError::Timeout { command, timeout }),
        };

        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = match credential {
            Some(credential) => scrub(stderr.trim(), credential),
            None => stderr.trim().to_string(),
        };
        Err(MirrorError::GitFailed {
            command,
            status: output.status.code(),
            stderr,
        })
    }

    /// `git init --bare --quiet`. Safe on an existing repository.
    pub async fn init_bare(&self, repo_path: &Path) -> Result<(), MirrorError> {
        let mut cmd = self.command(repo_path);
        cmd.args(["init", "--bare", "--quiet"]);
        self.run("init", cmd, LOCAL_COMMAND_TIMEOUT, None).await?;
        Ok(())
    }

    /// Force-fetch every branch and tag from `remote`, pruning refs that
    /// disappeared upstream.
    ///
    /// A failed fetch leaves existing refs untouched.
    pub(crate) async fn fetch(
        &self,
        repo_path: &Path,
        remote: &str,
        credential: Option<&Credential>,
    ) -> Result<(), MirrorError> {
        let mut cmd = self.command(repo_path);
        // Credential helpers would be handed the userinfo and might store it.
        cmd.args(["-c", "credential.helper="]);
        cmd.args(["fetch", "--force", "--prune", "--tags"]);
        cmd.arg(OsString::from(remote));
        cmd.arg(HEADS_REFSPEC);

        let result = self.run("fetch", cmd, self.timeout, credential).await;

        // FETCH_HEAD records where the fetch came from.
        let fetch_head = repo_path.join("FETCH_HEAD");
        if fetch_head.exists()
            && let Err(e) = std::fs::remove_file(&fetch_head)
        {
            tracing::debug!(path = %fetch_head.display(), error = %e, "Could not remove FETCH_HEAD");
        }

        result.map(|_| ())
    }
}

#[async_trait]
impl RepoMirror for GitMirror {
    async fn mirror(&self, request: &MirrorRequest<'_>) -> Result<MirrorOutcome, MirrorError> {
        let name = names::path_segment(request.repo_name)?;
        let repo_path = request.dest_parent.join(name);

        let status = ensure_dir(&repo_path, &self.dir_options)?;

        let remote = authenticated_url(
            request.clone_url,
            request.identity_login,
            request.credential,
        )?;

        // A failed init is not fatal: the repository may already exist, and a
        // genuinely broken one makes the fetch fail below.
        if let Err(e) = self.init_bare(&repo_path).await {
            tracing::debug!(path = %repo_path.display(), error = %e, "git init failed");
        }

        tracing::debug!(path = %repo_path.display(), remote = %remote, "Fetching");
        self.fetch(&repo_path, remote.expose(), Some(request.credential))
            .await?;

        Ok(MirrorOutcome {
            path: repo_path,
            created: status.created,
        })
    }
}
