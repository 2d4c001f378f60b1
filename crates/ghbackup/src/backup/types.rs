//! Backup run types.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fs::{DirOptions, DirectoryError};
use crate::github::{GitHubError, RepoRecord};
use crate::names::NameError;

/// Default number of concurrent mirror jobs per listing page.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// A repository discovered through one of the listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub clone_url: String,
}

impl RepositoryRef {
    /// Identity key used for de-duplication.
    pub fn key(&self) -> (&str, &str) {
        (&self.owner, &self.name)
    }
}

impl From<RepoRecord> for RepositoryRef {
    fn from(record: RepoRecord) -> Self {
        Self {
            owner: record.owner.login,
            name: record.name,
            clone_url: record.clone_url,
        }
    }
}

/// `(owner, name)` pairs already handled for the current credential.
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    seen: HashMap<String, HashSet<String>>,
    len: usize,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `(owner, name)` as processed. Returns false if it already was.
    pub fn insert(&mut self, owner: &str, name: &str) -> bool {
        if self.contains(owner, name) {
            return false;
        }
        self.seen
            .entry(owner.to_string())
            .or_default()
            .insert(name.to_string());
        self.len += 1;
        true
    }

    pub fn contains(&self, owner: &str, name: &str) -> bool {
        self.seen
            .get(owner)
            .is_some_and(|names| names.contains(name))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Options for one credential's backup.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Destination root; the identity's tree is created below it.
    pub root: PathBuf,
    /// Also download a default-branch archive next to every mirror.
    pub snapshots: bool,
    /// Maximum concurrent mirror jobs per listing page.
    pub concurrency: usize,
    /// Options for every directory created below `root`.
    pub dir_options: DirOptions,
}

impl BackupOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshots: false,
            concurrency: DEFAULT_CONCURRENCY,
            dir_options: DirOptions::default(),
        }
    }

    /// `root/identity/owner/name`.
    pub fn destination(&self, identity: &str, owner: &str, name: &str) -> PathBuf {
        self.owner_dir(identity, owner).join(name)
    }

    /// `root/identity/owner`.
    pub fn owner_dir(&self, identity: &str, owner: &str) -> PathBuf {
        self.identity_dir(identity).join(owner)
    }

    /// `root/identity`.
    pub fn identity_dir(&self, identity: &str) -> PathBuf {
        self.root.join(identity)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// States of one credential's backup. There is no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackupState {
    ResolvingIdentity,
    DiscoveringOrgs,
    MirroringOrgRepos,
    MirroringUserRepos,
    Done,
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResolvingIdentity => "resolving identity",
            Self::DiscoveringOrgs => "discovering organizations",
            Self::MirroringOrgRepos => "mirroring organization repositories",
            Self::MirroringUserRepos => "mirroring user repositories",
            Self::Done => "done",
        })
    }
}

/// Counts for one credential's backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// Login of the resolved identity.
    pub identity: String,
    /// Organizations discovered.
    pub orgs: usize,
    /// Listings (organization or user) aborted by a fetch failure.
    pub listing_failures: usize,
    /// Repositories mirrored successfully.
    pub mirrored: usize,
    /// Repositories whose mirror failed.
    pub failed: usize,
    /// Repositories skipped for an invalid name, bad record or directory
    /// failure.
    pub skipped: usize,
    /// Repositories seen again after their first discovery.
    pub duplicates: usize,
    /// Snapshot archives written.
    pub snapshots: usize,
    /// Snapshot downloads that failed.
    pub snapshot_failures: usize,
}

impl BackupReport {
    /// Whether any repository or listing failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.listing_failures > 0
    }
}

/// Failures that make a credential unusable for the rest of the run.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Could not resolve identity: {0}")]
    Identity(#[source] GitHubError),

    #[error("Identity login is not usable as a directory: {0}")]
    InvalidIdentity(#[source] NameError),

    #[error("Could not create identity directory: {0}")]
    Directory(#[source] DirectoryError),
}

impl BackupError {
    /// Whether the token itself was rejected.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Identity(e) if e.is_auth_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Account;

    #[test]
    fn test_processed_set_first_wins() {
        let mut set = ProcessedSet::new();
        assert!(set.is_empty());
        assert!(set.insert("acme", "widgets"));
        assert!(!set.insert("acme", "widgets"));
        assert!(set.contains("acme", "widgets"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_processed_set_is_case_sensitive() {
        let mut set = ProcessedSet::new();
        assert!(set.insert("acme", "widgets"));
        assert!(set.insert("Acme", "widgets"));
        assert!(set.insert("acme", "Widgets"));
        assert!(!set.contains("ACME", "WIDGETS"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_destination_is_deterministic() {
        let options = BackupOptions::new("/backup");
        assert_eq!(
            options.destination("alice", "acme", "widgets"),
            PathBuf::from("/backup/alice/acme/widgets")
        );
        assert_eq!(
            options.destination("alice", "acme", "widgets"),
            options.owner_dir("alice", "acme").join("widgets")
        );
        assert_eq!(options.identity_dir("alice"), PathBuf::from("/backup/alice"));
    }

    #[test]
    fn test_repository_ref_from_record() {
        let record = RepoRecord {
            name: "widgets".to_string(),
            clone_url: "https://github.com/acme/widgets.git".to_string(),
            owner: Account {
                login: "acme".to_string(),
            },
            default_branch: Some("main".to_string()),
        };
        let repo = RepositoryRef::from(record);
        assert_eq!(repo.key(), ("acme", "widgets"));
        assert_eq!(repo.clone_url, "https://github.com/acme/widgets.git");
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(BackupState::ResolvingIdentity < BackupState::DiscoveringOrgs);
        assert!(BackupState::MirroringOrgRepos < BackupState::MirroringUserRepos);
        assert_eq!(BackupState::Done.to_string(), "done");
    }

    #[test]
    fn test_report_has_failures() {
        assert!(!BackupReport::default().has_failures());
        assert!(
            BackupReport {
                failed: 1,
                ..BackupReport::default()
            }
            .has_failures()
        );
    }

    #[test]
    fn test_backup_error_auth() {
        let err = BackupError::Identity(GitHubError::AuthRequired { status: 401 });
        assert!(err.is_auth_error());
        assert_eq!(
            err.to_string(),
            "Could not resolve identity: Authentication failed (HTTP 401)"
        );
    }
}
