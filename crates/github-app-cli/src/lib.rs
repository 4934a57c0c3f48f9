//! # GitHub App CLI
//!
//! Command-line interface for browsing what a GitHub App can see.
//!
//! This module provides CLI commands for:
//! - Listing the organizations the app is installed on
//! - Listing repositories, branches, tags and pull requests
//! - Walking a branch's file tree
//! - Showing the resolved configuration
//!
//! Installation tokens and conditional responses are cached on disk between
//! runs unless `--no-cache` is given.

use clap::{Parser, Subcommand};
use github_app_api::cache::{CacheStore, NoopCache};
use github_app_api::{
    ApiError, AppIdentity, Branch, ClientConfig, Directory, File, GitHubClient, PullRequestState,
    PullRequestsOptions,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod file_cache;
mod settings;

pub use file_cache::FileCache;
pub use settings::{CliSettings, ENV_PREFIX};

// ============================================================================
// CLI Structure
// ============================================================================

/// GitHub App CLI - browse installations through the GitHub REST API
#[derive(Parser, Debug)]
#[command(name = "github-app")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Browse the organizations and repositories a GitHub App is installed on")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GITHUB_APP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Skip the on-disk token and response cache
    #[arg(long)]
    pub no_cache: bool,

    /// GitHub App ID (overrides the configuration)
    #[arg(long)]
    pub app_id: Option<u64>,

    /// Private key PEM file (overrides the configuration)
    #[arg(long)]
    pub private_key: Option<PathBuf>,

    /// API base URL (overrides the configuration)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut CliSettings) {
        if let Some(app_id) = self.app_id {
            settings.app_id = Some(app_id);
        }
        if let Some(path) = &self.private_key {
            settings.private_key_path = Some(path.clone());
        }
        if let Some(url) = &self.api_url {
            settings.api_url = url.clone();
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the organizations the app is installed on
    Orgs,

    /// List the repositories of an organization
    Repos {
        /// Organization (installation account) name
        org: String,
    },

    /// List the branches of a repository
    Branches { org: String, repo: String },

    /// List the tags of a repository
    Tags { org: String, repo: String },

    /// List the pull requests of a repository
    Pulls {
        org: String,
        repo: String,

        /// Pull request state (open, closed or all)
        #[arg(short, long, default_value = "open")]
        state: PullRequestState,
    },

    /// List the directories and files of a branch
    Files {
        org: String,
        repo: String,

        /// Branch to read, defaults to the repository's default branch
        #[arg(short, long)]
        branch: Option<String>,

        /// Directory within the branch, e.g. `src/client`
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Show the resolved configuration
    Config,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("GitHub API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Api(_) => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Logging { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Unable to read private key {path}: {source}")]
    PrivateKey {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli.log_level, cli.json_logs)?;

    let mut settings = CliSettings::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    debug!(api_url = %settings.api_url, "Resolved settings");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli.command, &settings, cli.no_cache, &mut out).await
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Logs go to stderr so command
/// output on stdout stays machine readable.
pub fn initialize_logging(level: &str, json: bool) -> Result<(), CliError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .map_err(|e| CliError::Logging {
            message: format!("invalid log level '{}': {}", level, e),
        })?;

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })
}

/// Build an app client from resolved settings.
///
/// # Errors
///
/// Returns `ConfigError::MissingRequired` without an app ID or key path,
/// `ConfigError::PrivateKey` if the key file cannot be read and
/// `ApiError::InvalidKey` if it does not hold an RSA key.
pub async fn build_client(settings: &CliSettings, no_cache: bool) -> Result<GitHubClient, CliError> {
    let app_id = settings.require_app_id()?;
    let key_path = settings.require_private_key_path()?;

    let pem = tokio::fs::read_to_string(key_path)
        .await
        .map_err(|source| ConfigError::PrivateKey {
            path: key_path.to_path_buf(),
            source,
        })?;
    let identity = AppIdentity::from_pem(app_id, &pem)?;

    let config = ClientConfig::default()
        .with_github_api_url(settings.api_url.clone())
        .with_timeout(settings.timeout());

    let cache: Arc<dyn CacheStore> = match settings.resolved_cache_dir() {
        Some(dir) if !no_cache => {
            debug!(cache_dir = %dir.display(), "Using file cache");
            Arc::new(FileCache::new(dir))
        }
        _ => Arc::new(NoopCache),
    };

    Ok(GitHubClient::builder(identity)
        .config(config)
        .cache(cache)
        .build()?)
}

/// Run one command, writing its output to `out`.
pub async fn execute<W: Write>(
    command: &Commands,
    settings: &CliSettings,
    no_cache: bool,
    out: &mut W,
) -> Result<(), CliError> {
    if let Commands::Config = command {
        out.write_all(settings.to_toml()?.as_bytes())?;
        return Ok(());
    }

    let client = build_client(settings, no_cache).await?;
    info!(app_id = %client.app_id(), "Authenticated as GitHub App");

    execute_api_command(command, &client, out).await
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Run a command that talks to the API.
pub async fn execute_api_command<W: Write>(
    command: &Commands,
    client: &GitHubClient,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Commands::Orgs => {
            for org in client.organizations().await? {
                let id = org.id().map(|id| id.to_string()).unwrap_or_default();
                writeln!(out, "{}\t{}", org.name(), id)?;
            }
        }
        Commands::Repos { org } => {
            let org = client.organization(org).await?;
            let mut repositories = org.repositories();
            while let Some(repository) = repositories.try_next().await? {
                let visibility = if repository.is_private() {
                    "private"
                } else {
                    "public"
                };
                writeln!(out, "{}\t{}", repository.full_name(), visibility)?;
            }
        }
        Commands::Branches { org, repo } => {
            let repository = client.organization(org).await?.repository(repo).await?;
            let mut branches = repository.branches();
            while let Some(branch) = branches.try_next().await? {
                writeln!(out, "{}\t{}", branch.name(), branch.commit())?;
            }
        }
        Commands::Tags { org, repo } => {
            let repository = client.organization(org).await?.repository(repo).await?;
            let mut tags = repository.tags();
            while let Some(tag) = tags.try_next().await? {
                writeln!(out, "{}\t{}", tag.name(), tag.commit())?;
            }
        }
        Commands::Pulls { org, repo, state } => {
            let repository = client.organization(org).await?.repository(repo).await?;
            let mut pulls = repository.pull_requests(PullRequestsOptions::new().state(*state));
            while let Some(pull) = pulls.try_next().await? {
                writeln!(out, "#{}\t{}", pull.number(), pull.title().unwrap_or_default())?;
            }
        }
        Commands::Files {
            org,
            repo,
            branch,
            path,
        } => {
            let repository = client.organization(org).await?.repository(repo).await?;
            let branch = match branch {
                Some(name) => repository.branch(name).await?,
                None => repository.default_branch().await?,
            };
            list_files(&branch, path.as_deref(), out).await?;
        }
        Commands::Config => {
            return Err(CliError::InvalidArgument {
                arg: "config".to_string(),
                message: "does not use the API".to_string(),
            })
        }
    }

    Ok(())
}

async fn list_files<W: Write>(
    branch: &Branch,
    path: Option<&str>,
    out: &mut W,
) -> Result<(), CliError> {
    let mut segments = path
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty());

    let Some(first) = segments.next() else {
        return write_listing(branch.directories().await?, branch.files().await?, out);
    };

    let mut directory = branch.directory(first).await?;
    for segment in segments {
        directory = directory.directory(segment).await?;
    }

    write_listing(directory.directories().await?, directory.files().await?, out)
}

fn write_listing<W: Write>(
    directories: Vec<Directory>,
    files: Vec<File>,
    out: &mut W,
) -> Result<(), CliError> {
    for directory in &directories {
        writeln!(out, "{}/", directory.name())?;
    }
    for file in &files {
        writeln!(out, "{}\t{}", file.name(), file.size())?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
