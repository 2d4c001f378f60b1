//! Progress reporting for backup runs.
//!
//! The engine never prints. Every state transition, skip and failure is
//! reported as a [`BackupProgress`] event and the caller decides how to render
//! it. Error strings carried by events have already been scrubbed of the
//! credential.

use std::path::PathBuf;

use super::types::{BackupReport, BackupState};

/// Progress events emitted while backing up one credential.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum BackupProgress {
    /// The state machine moved to a new state.
    StateChanged { state: BackupState },

    /// The credential's account was resolved.
    IdentityResolved { login: String },

    /// A directory in the backup tree was created for the first time.
    CreatedDirectory { path: PathBuf },

    /// Organization discovery finished.
    OrgsDiscovered { count: usize },

    /// Starting to list repositories for a namespace (org login, or the
    /// identity for the user pass).
    FetchingRepos { namespace: String },

    /// Fetched one page of a repository listing.
    FetchedPage {
        namespace: String,
        /// Page number (1-indexed).
        page: u32,
        /// Number of records on this page.
        count: usize,
    },

    /// A listing was aborted. The run continues with the next namespace.
    ListingFailed { namespace: String, error: String },

    /// A record on a listing page could not be decoded.
    MalformedRecord { namespace: String, error: String },

    /// An owner or repository name failed validation.
    InvalidName {
        owner: String,
        name: String,
        error: String,
    },

    /// The repository was already handled earlier in this run.
    Duplicate { owner: String, name: String },

    /// A directory could not be created; its subtree is skipped.
    DirectoryFailed { path: PathBuf, error: String },

    /// Starting to mirror a repository.
    Mirroring { owner: String, name: String },

    /// The repository was mirrored.
    Mirrored {
        owner: String,
        name: String,
        path: PathBuf,
        /// True when this run created the mirror.
        created: bool,
    },

    /// Mirroring failed; the repository keeps its previous state.
    MirrorFailed {
        owner: String,
        name: String,
        error: String,
    },

    /// A snapshot archive was saved.
    SnapshotSaved {
        owner: String,
        name: String,
        path: PathBuf,
        bytes: u64,
    },

    /// The archive endpoint answered with a non-success status.
    SnapshotSkipped {
        owner: String,
        name: String,
        status: u16,
    },

    /// Downloading a snapshot failed.
    SnapshotFailed {
        owner: String,
        name: String,
        error: String,
    },

    /// The credential has been fully processed.
    Finished { report: BackupReport },
}

impl BackupProgress {
    /// Whether this event reports a skip or failure.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::ListingFailed { .. }
                | Self::MalformedRecord { .. }
                | Self::InvalidName { .. }
                | Self::DirectoryFailed { .. }
                | Self::MirrorFailed { .. }
                | Self::SnapshotFailed { .. }
        )
    }
}

/// Callback for progress updates during a backup.
pub type ProgressCallback = Box<dyn Fn(BackupProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: BackupProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
