//! github-backup - mirror every repository your GitHub tokens can reach.

mod config;
mod progress;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "github-backup")]
#[command(version)]
#[command(about = "Mirror every GitHub repository a token can reach")]
#[command(
    long_about = "github-backup discovers every repository reachable by each configured \
token (personal, collaborator and organization repositories) and keeps a bare git \
mirror of each one under <directory>/<identity>/<owner>/<repo>."
)]
#[command(after_long_help = r#"EXAMPLES
    Back up using a config file:
        $ github-backup config.json

    Back up using environment variables only:
        $ GHBACKUP_DIRECTORY=~/backup GHBACKUP_TOKENS=ghp_a,ghp_b github-backup

    Also save a zip snapshot of each default branch, four mirrors at a time:
        $ github-backup config.json --snapshots -c 4

CONFIGURATION
    Keys are read from the JSON config file, then GHBACKUP_* environment
    variables, then the flags below. A .env file in the current directory is
    loaded first.

ENVIRONMENT VARIABLES
    GHBACKUP_DIRECTORY          Destination root (~ is expanded)
    GHBACKUP_TOKENS             Comma-separated access tokens
    GHBACKUP_SNAPSHOTS          Download default-branch archives (true/false)
    GHBACKUP_CONCURRENCY        Concurrent mirrors per listing page (default 1)
    GHBACKUP_API_URL            API base URL (default https://api.github.com)
    GHBACKUP_UNRAID             Normalize ownership to 99:100 (true/false)
    GHBACKUP_TIMEOUTS__GIT_SECS Timeout for one git fetch (default 3600)
    RUST_LOG                    Log filter (default ghbackup=info,ghbackup_cli=info)
"#)]
struct Cli {
    /// Path to the JSON config file
    config: Option<PathBuf>,

    /// Download a zip snapshot of each repository's default branch
    #[arg(long)]
    snapshots: bool,

    /// Concurrent mirror jobs per listing page
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// API base URL (GitHub Enterprise)
    #[arg(long)]
    api_url: Option<String>,

    /// Path to the git binary (default: looked up on PATH)
    #[arg(long)]
    git: Option<PathBuf>,

    /// Normalize directory ownership to nobody:users (99:100)
    #[arg(long)]
    unraid: bool,
}

impl Cli {
    /// Apply flags on top of file and environment configuration.
    fn apply(&self, config: &mut config::Config) {
        if self.snapshots {
            config.snapshots = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(git) = &self.git {
            config.git = Some(git.clone());
        }
        if self.unraid {
            config.unraid = true;
        }
    }
}

fn load_settings(cli: &Cli) -> Result<config::Settings, config::ConfigError> {
    let mut config = config::Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.into_settings()
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("ghbackup=info,ghbackup_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let summary = run::run(&settings).await;
    if summary.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
