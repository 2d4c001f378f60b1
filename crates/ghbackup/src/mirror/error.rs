//! Mirror engine error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::fs::DirectoryError;
use crate::names::NameError;

/// Errors that can occur while mirroring one repository.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Cannot authenticate clone URL {url}: {reason}")]
    InvalidCloneUrl { url: String, reason: String },

    #[error("git executable not found: {0}")]
    GitNotFound(String),

    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("git {command} exited with {}: {stderr}", status.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    GitFailed {
        command: &'static str,
        status: Option<i32>,
        stderr: String,
    },

    #[error("git {command} timed out after {}s", timeout.as_secs())]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },
}

impl MirrorError {
    /// Create an invalid clone URL error.
    #[inline]
    pub fn invalid_clone_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCloneUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
