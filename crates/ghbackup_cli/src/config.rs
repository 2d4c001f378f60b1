//! Configuration for github-backup.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GHBACKUP_`, e.g. `GHBACKUP_TOKENS`)
//! 3. The JSON config file given on the command line
//! 4. Built-in defaults
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `GHBACKUP_TIMEOUTS__GIT_SECS=600`.
//!
//! Example config file:
//! ```json
//! {
//!   "directory": "~/backups/github",
//!   "tokens": "ghp_first,ghp_second",
//!   "snapshots": true,
//!   "concurrency": 4,
//!   "unraid": false,
//!   "timeouts": { "git_secs": 1800 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config as ConfigSource, ConfigBuilder, Environment, File, FileFormat};
use directories::BaseDirs;
use ghbackup::github::DEFAULT_API_URL;
use ghbackup::{Credential, Ownership};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "GHBACKUP";

/// Errors that make the configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("No backup directory configured (set \"directory\" or GHBACKUP_DIRECTORY)")]
    MissingDirectory,

    #[error("No tokens configured (set \"tokens\" or GHBACKUP_TOKENS)")]
    MissingTokens,

    #[error("The configured token list is empty")]
    EmptyTokens,

    #[error("owner_uid and owner_gid must be set together")]
    PartialOwnership,
}

/// A token list as written by the user: one string (comma-separated) or a
/// list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TokenSpec {
    One(String),
    Many(Vec<String>),
}

impl TokenSpec {
    /// Split on commas, trim whitespace and drop empty entries.
    pub fn normalize(&self) -> Vec<String> {
        let entries: Vec<&str> = match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(list) => list.iter().map(String::as_str).collect(),
        };
        entries
            .into_iter()
            .flat_map(|entry| entry.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Per-call timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Metadata API calls.
    pub api_secs: u64,
    /// Snapshot archive downloads.
    pub archive_secs: u64,
    /// A single `git fetch`.
    pub git_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            api_secs: 30,
            archive_secs: 600,
            git_secs: 3600,
        }
    }
}

/// Raw configuration as loaded from file and environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination root. `~` is expanded.
    pub directory: Option<String>,
    /// Legacy token key.
    pub token: Option<TokenSpec>,
    /// Token list; wins over `token`.
    pub tokens: Option<TokenSpec>,
    /// Download a default-branch archive next to every mirror.
    pub snapshots: bool,
    /// Concurrent mirror jobs per listing page.
    pub concurrency: usize,
    /// API base URL (GitHub Enterprise).
    pub api_url: String,
    /// Path to the git binary. Looked up on `PATH` when unset.
    pub git: Option<PathBuf>,
    /// Normalize directory ownership to `nobody:users` (99:100).
    pub unraid: bool,
    pub owner_uid: Option<u32>,
    pub owner_gid: Option<u32>,
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: None,
            token: None,
            tokens: None,
            snapshots: false,
            concurrency: 1,
            api_url: DEFAULT_API_URL.to_string(),
            git: None,
            unraid: false,
            owner_uid: None,
            owner_gid: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Validated settings for a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub credentials: Vec<Credential>,
    pub snapshots: bool,
    pub concurrency: usize,
    pub api_url: String,
    pub git: Option<PathBuf>,
    pub ownership: Option<Ownership>,
    pub api_timeout: Duration,
    pub archive_timeout: Duration,
    pub git_timeout: Duration,
}

impl Config {
    /// Layered sources: the optional JSON file, then `GHBACKUP_` variables.
    pub fn builder(path: Option<&Path>) -> ConfigBuilder<DefaultState> {
        let mut builder = ConfigSource::builder();

        if let Some(path) = path {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Json)
                    .required(true),
            );
        }

        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
    }

    /// Build and deserialize.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize::<Config>()?)
    }

    /// Load from the optional config file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_builder(Self::builder(path))
    }

    /// The effective token list: `tokens` if set, else `token`.
    pub fn token_list(&self) -> Result<Vec<String>, ConfigError> {
        let spec = self
            .tokens
            .as_ref()
            .or(self.token.as_ref())
            .ok_or(ConfigError::MissingTokens)?;
        let tokens = spec.normalize();
        if tokens.is_empty() {
            return Err(ConfigError::EmptyTokens);
        }
        Ok(tokens)
    }

    /// Explicit uid/gid win over `unraid`.
    pub fn ownership(&self) -> Result<Option<Ownership>, ConfigError> {
        match (self.owner_uid, self.owner_gid) {
            (Some(uid), Some(gid)) => Ok(Some(Ownership { uid, gid })),
            (None, None) if self.unraid => Ok(Some(Ownership::UNRAID)),
            (None, None) => Ok(None),
            _ => Err(ConfigError::PartialOwnership),
        }
    }

    /// Validate into run settings.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let directory = self
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(ConfigError::MissingDirectory)?;

        Ok(Settings {
            root: expand_home(directory),
            credentials: self.token_list()?.iter().map(Credential::new).collect(),
            ownership: self.ownership()?,
            snapshots: self.snapshots,
            concurrency: self.concurrency.max(1),
            api_url: self.api_url,
            git: self.git,
            api_timeout: Duration::from_secs(self.timeouts.api_secs),
            archive_timeout: Duration::from_secs(self.timeouts.archive_secs),
            git_timeout: Duration::from_secs(self.timeouts.git_secs),
        })
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match BaseDirs::new() {
        Some(dirs) if rest.is_empty() => dirs.home_dir().to_path_buf(),
        Some(dirs) => dirs.home_dir().join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> Config {
        let settings = ConfigSource::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .unwrap();
        settings.try_deserialize().unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.directory.is_none());
        assert!(!config.snapshots);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.timeouts.api_secs, 30);
        assert_eq!(config.timeouts.archive_secs, 600);
        assert_eq!(config.timeouts.git_secs, 3600);
    }

    #[test]
    fn test_config_from_json() {
        let config = from_json(
            r#"{
                "directory": "/srv/backup",
                "tokens": ["tok1", "tok2"],
                "snapshots": true,
                "concurrency": 4,
                "timeouts": { "git_secs": 120 }
            }"#,
        );

        assert_eq!(config.directory.as_deref(), Some("/srv/backup"));
        assert_eq!(config.token_list().unwrap(), vec!["tok1", "tok2"]);
        assert!(config.snapshots);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeouts.git_secs, 120);
        // Unset nested keys keep their defaults.
        assert_eq!(config.timeouts.api_secs, 30);
    }

    #[test]
    fn test_tokens_string_is_split() {
        let config = from_json(r#"{ "tokens": " a , b,, c ," }"#);
        assert_eq!(config.token_list().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_legacy_token_key() {
        let config = from_json(r#"{ "token": "legacy" }"#);
        assert_eq!(config.token_list().unwrap(), vec!["legacy"]);

        let config = from_json(r#"{ "token": ["one", " two "] }"#);
        assert_eq!(config.token_list().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_tokens_wins_over_token() {
        let config = from_json(r#"{ "token": "old", "tokens": "new" }"#);
        assert_eq!(config.token_list().unwrap(), vec!["new"]);
    }

    #[test]
    fn test_missing_and_empty_tokens() {
        assert!(matches!(
            Config::default().token_list(),
            Err(ConfigError::MissingTokens)
        ));
        assert!(matches!(
            from_json(r#"{ "tokens": " , " }"#).token_list(),
            Err(ConfigError::EmptyTokens)
        ));
        assert!(matches!(
            from_json(r#"{ "tokens": [] }"#).token_list(),
            Err(ConfigError::EmptyTokens)
        ));
    }

    #[test]
    fn test_missing_directory() {
        let config = from_json(r#"{ "tokens": "tok" }"#);
        assert!(matches!(
            config.into_settings(),
            Err(ConfigError::MissingDirectory)
        ));
    }

    #[test]
    fn test_into_settings() {
        let settings = from_json(
            r#"{
                "directory": "/srv/backup",
                "tokens": "tok1,tok2",
                "concurrency": 0,
                "api_url": "https://ghe.example.com/api/v3"
            }"#,
        )
        .into_settings()
        .unwrap();

        assert_eq!(settings.root, PathBuf::from("/srv/backup"));
        assert_eq!(settings.credentials.len(), 2);
        assert_eq!(settings.credentials[1].expose(), "tok2");
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(settings.git_timeout, Duration::from_secs(3600));
        assert!(settings.ownership.is_none());
    }

    #[test]
    fn test_ownership() {
        assert_eq!(
            from_json(r#"{ "unraid": true }"#).ownership().unwrap(),
            Some(Ownership::UNRAID)
        );
        assert_eq!(
            from_json(r#"{ "unraid": true, "owner_uid": 1000, "owner_gid": 1000 }"#)
                .ownership()
                .unwrap(),
            Some(Ownership {
                uid: 1000,
                gid: 1000
            })
        );
        assert!(matches!(
            from_json(r#"{ "owner_uid": 1000 }"#).ownership(),
            Err(ConfigError::PartialOwnership)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let body = serde_json::json!({ "directory": "/data", "token": "abc" });
        std::fs::write(&path, body.to_string()).unwrap();

        let config = Config::from_builder(
            ConfigSource::builder().add_source(File::from(path).format(FileFormat::Json)),
        )
        .unwrap();
        assert_eq!(config.directory.as_deref(), Some("/data"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Config::from_builder(Config::builder(Some(&tmp.path().join("nope.json"))));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_config_invalid_json() {
        let result = ConfigSource::builder()
            .add_source(File::from_str(r#"{ "directory": "#, FileFormat::Json))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(Some(
                [
                    ("GHBACKUP_TOKENS".to_string(), "env1,env2".to_string()),
                    ("GHBACKUP_TIMEOUTS__GIT_SECS".to_string(), "60".to_string()),
                ]
                .into_iter()
                .collect(),
            ));

        let config = Config::from_builder(
            ConfigSource::builder()
                .add_source(File::from_str(
                    r#"{ "directory": "/data", "tokens": "file" }"#,
                    FileFormat::Json,
                ))
                .add_source(source),
        )
        .unwrap();

        assert_eq!(config.token_list().unwrap(), vec!["env1", "env2"]);
        assert_eq!(config.timeouts.git_secs, 60);
        assert_eq!(config.directory.as_deref(), Some("/data"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("relative"), PathBuf::from("relative"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));

        if let Some(dirs) = BaseDirs::new() {
            assert_eq!(expand_home("~"), dirs.home_dir());
            assert_eq!(expand_home("~/backup"), dirs.home_dir().join("backup"));
        }
    }
}
