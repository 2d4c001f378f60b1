//! Run controller: one backup pass per configured token.

use ghbackup::backup::{BackupOptions, ProgressCallback, backup_credential};
use ghbackup::fs::{DirOptions, ensure_dir};
use ghbackup::github::{ClientOptions, GitHubClient};
use ghbackup::mirror::{GitMirror, MirrorError};

use crate::config::Settings;
use crate::progress::LoggingReporter;

/// Outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tokens configured.
    pub credentials: usize,
    /// Tokens whose backup failed entirely.
    pub failed: usize,
    /// The run could not start (root directory or git unavailable).
    pub aborted: bool,
}

impl RunSummary {
    /// A run fails only when it could not start, or when its single token
    /// failed. With several tokens, individual failures are only logged.
    pub fn is_failure(&self) -> bool {
        self.aborted || (self.credentials == 1 && self.failed == 1)
    }

    fn aborted(credentials: usize) -> Self {
        Self {
            credentials,
            failed: 0,
            aborted: true,
        }
    }
}

fn mirror_engine(settings: &Settings, dir_options: DirOptions) -> Result<GitMirror, MirrorError> {
    let mirror = match &settings.git {
        Some(git) => GitMirror::new(git),
        None => GitMirror::from_path()?,
    };
    Ok(mirror
        .with_timeout(settings.git_timeout)
        .with_dir_options(dir_options))
}

/// Back up every configured token in order.
pub async fn run(settings: &Settings) -> RunSummary {
    let total = settings.credentials.len();
    let dir_options = DirOptions {
        ownership: settings.ownership,
    };

    match ensure_dir(&settings.root, &dir_options) {
        Ok(status) if status.created => {
            tracing::info!(path = %settings.root.display(), "Created directory");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "Cannot use backup directory");
            return RunSummary::aborted(total);
        }
    }

    let mirror = match mirror_engine(settings, dir_options) {
        Ok(mirror) => mirror,
        Err(e) => {
            tracing::error!(error = %e, "Cannot run git");
            return RunSummary::aborted(total);
        }
    };

    let options = BackupOptions {
        snapshots: settings.snapshots,
        concurrency: settings.concurrency,
        dir_options,
        ..BackupOptions::new(&settings.root)
    };

    let reporter = LoggingReporter::new();
    let callback: ProgressCallback = Box::new(move |event| reporter.handle(event));

    let mut failed = 0;
    for (i, credential) in settings.credentials.iter().enumerate() {
        if total > 1 {
            tracing::info!(
                "Processing token {}/{} (ending in {})",
                i + 1,
                total,
                credential.suffix()
            );
        }

        let client = match GitHubClient::new(
            credential.clone(),
            ClientOptions {
                api_url: settings.api_url.clone(),
                api_timeout: settings.api_timeout,
                archive_timeout: settings.archive_timeout,
            },
        ) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(token = %credential, error = %e, "Failed to create API client");
                failed += 1;
                continue;
            }
        };

        if let Err(e) = backup_credential(&client, &mirror, &options, Some(&callback)).await {
            tracing::error!(token = %credential, error = %e, "Backup failed");
            failed += 1;
        }
    }

    RunSummary {
        credentials: total,
        failed,
        aborted: false,
    }
}
