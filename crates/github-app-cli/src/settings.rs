//! CLI settings.
//!
//! Settings are resolved with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables prefixed with `GITHUB_APP_`, e.g.
//!    `GITHUB_APP_APP_ID` or `GITHUB_APP_PRIVATE_KEY_PATH`
//! 3. The TOML file given with `--config`
//! 4. Built-in defaults
//!
//! Example file:
//! ```toml
//! app_id = 123456
//! private_key_path = "/etc/github-app/private-key.pem"
//! api_url = "https://api.github.com"
//! cache_dir = "/var/cache/github-app"
//! timeout_seconds = 30
//! ```

use github_app_api::client::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ConfigError;

/// Environment variable prefix for settings.
pub const ENV_PREFIX: &str = "GITHUB_APP";

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliSettings {
    /// GitHub App ID
    pub app_id: Option<u64>,
    /// PEM file holding the app's private key
    pub private_key_path: Option<PathBuf>,
    /// API base URL (GitHub Enterprise Server uses `https://<host>/api/v3`)
    pub api_url: String,
    /// Directory for cached tokens and responses
    pub cache_dir: Option<PathBuf>,
    pub timeout_seconds: u64,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key_path: None,
            api_url: DEFAULT_API_URL.to_string(),
            cache_dir: None,
            timeout_seconds: 30,
        }
    }
}

impl CliSettings {
    /// Load settings from an optional TOML file and `GITHUB_APP_*` variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileNotFound` for an explicit path that does not
    /// exist and `ConfigError::Load` for malformed files or values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// As [`load`](Self::load), reading variables with a custom prefix.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }

            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// The app ID, which has no default.
    pub fn require_app_id(&self) -> Result<u64, ConfigError> {
        self.app_id.ok_or_else(|| ConfigError::MissingRequired {
            key: "app_id".to_string(),
        })
    }

    /// The private key path, which has no default.
    pub fn require_private_key_path(&self) -> Result<&Path, ConfigError> {
        self.private_key_path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "private_key_path".to_string(),
            })
    }

    /// Cache directory, defaulting to `<user cache dir>/github-app`.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("github-app")))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Render the settings as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
