//! Directory creation for the backup tree.
//!
//! Directories are created with mode `0o770` (no world access). When an
//! [`Ownership`] is configured the leaf directory is additionally `chown`ed to
//! it on a best-effort basis: failures are logged and otherwise ignored.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Permission bits for every directory in the tree.
pub const DIR_MODE: u32 = 0o770;

/// Target owner for created directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    /// Unraid shares expect `nobody:users`.
    pub const UNRAID: Self = Self { uid: 99, gid: 100 };
}

/// Options for [`ensure_dir`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirOptions {
    /// Best-effort owner to apply after creation.
    pub ownership: Option<Ownership>,
}

/// Outcome of [`ensure_dir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirStatus {
    /// False when the directory already existed.
    pub created: bool,
}

/// Errors from directory creation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Permission denied creating {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} exists and is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Failed to create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DirectoryError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Io { path, source },
        }
    }
}

fn builder(recursive: bool) -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
}

/// Create `path` and any missing ancestors.
///
/// Idempotent and safe to call concurrently for the same path: exactly one
/// caller observes `created: true`.
pub fn ensure_dir(path: &Path, options: &DirOptions) -> Result<DirStatus, DirectoryError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        builder(true)
            .create(parent)
            .map_err(|e| DirectoryError::from_io(parent, e))?;
    }

    let created = match builder(false).create(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if !path.is_dir() {
                return Err(DirectoryError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            false
        }
        Err(e) => return Err(DirectoryError::from_io(path, e)),
    };

    if let Some(owner) = options.ownership {
        normalize_ownership(path, owner);
    }

    Ok(DirStatus { created })
}

/// Best-effort `chown`. Never fails the caller.
fn normalize_ownership(path: &Path, owner: Ownership) {
    #[cfg(unix)]
    {
        if let Err(e) = std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid)) {
            tracing::debug!(
                path = %path.display(),
                uid = owner.uid,
                gid = owner.gid,
                error = %e,
                "Could not change directory ownership"
            );
        }
    }

    #[cfg(not(unix))]
    tracing::debug!(
        path = %path.display(),
        uid = owner.uid,
        gid = owner.gid,
        "Ownership normalization is only supported on Unix"
    );
}
