//! Rendering of backup progress as structured log lines.

use ghbackup::BackupProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: BackupProgress) {
        match event {
            BackupProgress::StateChanged { state } => {
                tracing::debug!(%state, "State");
            }

            BackupProgress::IdentityResolved { login } => {
                tracing::info!(identity = %login, "Authenticated");
            }

            BackupProgress::CreatedDirectory { path } => {
                tracing::info!(path = %path.display(), "Created directory");
            }

            BackupProgress::OrgsDiscovered { count } => {
                tracing::info!(count, "Discovered organizations");
            }

            BackupProgress::FetchingRepos { namespace } => {
                tracing::info!(namespace = %namespace, "Fetching repositories");
            }

            BackupProgress::FetchedPage {
                namespace,
                page,
                count,
            } => {
                tracing::debug!(namespace = %namespace, page, count, "Fetched page");
            }

            BackupProgress::ListingFailed { namespace, error } => {
                tracing::warn!(namespace = %namespace, error = %error, "Failed to list repositories");
            }

            BackupProgress::MalformedRecord { namespace, error } => {
                tracing::warn!(namespace = %namespace, error = %error, "Skipping malformed record");
            }

            BackupProgress::InvalidName { owner, name, error } => {
                tracing::warn!(repo = %format!("{}/{}", owner, name), error = %error, "Skipping repository with unsafe name");
            }

            BackupProgress::Duplicate { owner, name } => {
                tracing::debug!(repo = %format!("{}/{}", owner, name), "Already processed");
            }

            BackupProgress::DirectoryFailed { path, error } => {
                tracing::warn!(path = %path.display(), error = %error, "Failed to create directory");
            }

            BackupProgress::Mirroring { owner, name } => {
                tracing::info!(repo = %format!("{}/{}", owner, name), "Mirroring");
            }

            BackupProgress::Mirrored {
                owner,
                name,
                path,
                created,
            } => {
                tracing::debug!(
                    repo = %format!("{}/{}", owner, name),
                    path = %path.display(),
                    created,
                    "Mirrored"
                );
            }

            BackupProgress::MirrorFailed { owner, name, error } => {
                tracing::warn!(repo = %format!("{}/{}", owner, name), error = %error, "Failed to mirror");
            }

            BackupProgress::SnapshotSaved {
                owner,
                name,
                path,
                bytes,
            } => {
                tracing::info!(
                    repo = %format!("{}/{}", owner, name),
                    path = %path.display(),
                    bytes,
                    "Saved snapshot"
                );
            }

            BackupProgress::SnapshotSkipped {
                owner,
                name,
                status,
            } => {
                tracing::debug!(repo = %format!("{}/{}", owner, name), status, "No snapshot available");
            }

            BackupProgress::SnapshotFailed { owner, name, error } => {
                tracing::warn!(repo = %format!("{}/{}", owner, name), error = %error, "Failed to download snapshot");
            }

            BackupProgress::Finished { report } => {
                tracing::info!(
                    identity = %report.identity,
                    orgs = report.orgs,
                    mirrored = report.mirrored,
                    failed = report.failed,
                    skipped = report.skipped,
                    listing_failures = report.listing_failures,
                    snapshots = report.snapshots,
                    "Backup complete"
                );
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
