//! ghbackup - mirror every GitHub repository a token can reach.
//!
//! For each credential the library resolves the account behind it, discovers
//! its organizations and every repository it can see, and keeps a bare mirror
//! of each one under `root/<identity>/<owner>/<repo>`:
//!
//! - [`github`]: authenticated API client and Link-header pagination
//! - [`mirror`]: bare-repository mirroring through `git`
//! - [`snapshot`]: optional default-branch archives
//! - [`backup`]: the per-credential orchestration
//!
//! # Example
//!
//! ```ignore
//! use ghbackup::backup::{BackupOptions, backup_credential};
//! use ghbackup::github::{ClientOptions, GitHubClient};
//! use ghbackup::mirror::GitMirror;
//! use ghbackup::Credential;
//!
//! let client = GitHubClient::new(Credential::new(token), ClientOptions::default())?;
//! let mirror = GitMirror::from_path()?;
//! let report = backup_credential(&client, &mirror, &BackupOptions::new("/backup"), None).await?;
//! println!("{} repositories mirrored", report.mirrored);
//! ```

pub mod backup;
pub mod credential;
pub mod fs;
pub mod github;
pub mod http;
pub mod mirror;
pub mod names;
pub mod snapshot;

pub use backup::{BackupError, BackupOptions, BackupProgress, BackupReport, backup_credential};
pub use credential::Credential;
pub use fs::{DirOptions, Ownership};
pub use mirror::{GitMirror, RepoMirror};
