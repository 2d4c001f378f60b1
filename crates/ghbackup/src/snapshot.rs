//! Archive snapshots of a repository's default branch.
//!
//! The archive is streamed to `<repo>.zip.part` and renamed over
//! `<repo>.zip` once complete, so an interrupted download never replaces a
//! good snapshot.

use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::github::{GitHubClient, GitHubError};
use crate::http::HttpError;
use crate::names::{self, NameError};

/// Result of a snapshot attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The archive was written to `path`.
    Saved { path: PathBuf, bytes: u64 },
    /// The API answered with a non-2xx status; nothing was written.
    Skipped { status: u16 },
}

/// Errors from a snapshot download. All of them are best-effort failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("Archive request failed: {0}")]
    Request(#[from] GitHubError),

    #[error("Archive download interrupted: {0}")]
    Stream(#[from] HttpError),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SnapshotError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Path of the snapshot archive for `repo` below `dest_parent`.
pub fn snapshot_path(dest_parent: &Path, repo: &str) -> PathBuf {
    dest_parent.join(format!("{repo}.zip"))
}

/// Download the default-branch archive of `owner/repo` to
/// `dest_parent/<repo>.zip`, replacing any previous snapshot.
pub async fn download_snapshot(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    dest_parent: &Path,
) -> Result<SnapshotOutcome, SnapshotError> {
    let owner = names::path_segment(owner)?;
    let repo = names::path_segment(repo)?;

    let url = client.archive_url(owner, repo);
    let resp = client.get_streaming(&url).await?;

    if !resp.is_success() {
        tracing::debug!(url = %url, status = resp.status, "Archive not available");
        return Ok(SnapshotOutcome::Skipped {
            status: resp.status,
        });
    }

    let path = snapshot_path(dest_parent, repo);
    let part = dest_parent.join(format!("{repo}.zip.part"));

    match write_body(&part, resp.body).await {
        Ok(bytes) => {
            tokio::fs::rename(&part, &path)
                .await
                .map_err(|e| SnapshotError::io(&path, e))?;
            tracing::debug!(path = %path.display(), bytes, "Saved archive");
            Ok(SnapshotOutcome::Saved { path, bytes })
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(e)
        }
    }
}

async fn write_body(
    part: &Path,
    mut body: futures::stream::BoxStream<'static, Result<Vec<u8>, HttpError>>,
) -> Result<u64, SnapshotError> {
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| SnapshotError::io(part, e))?;

    let mut bytes = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| SnapshotError::io(part, e))?;
        bytes += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| SnapshotError::io(part, e))?;
    Ok(bytes)
}
