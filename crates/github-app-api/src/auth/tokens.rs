//! Installation token lifecycle.
//!
//! Each [`Organization`](crate::client::Organization) owns one
//! [`TokenProvider`]. The provider hands out the installation's access token,
//! exchanging a new one through the app-authenticated API only when the
//! current token is missing or expired.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::InstallationToken;
use crate::cache::CacheStore;
use crate::client::{ApiClient, Params};
use crate::error::ApiError;

/// Body returned by `POST <access_tokens_url>`.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct TokenState {
    token: Option<InstallationToken>,
    loaded: bool,
}

/// Supplies a valid installation access token for one installation.
///
/// Lookup order:
/// 1. on first use, the token persisted under `token-<name>` /
///    `token-expires-<name>` in the cache store;
/// 2. the in-memory token while it is unexpired;
/// 3. a fresh exchange against the installation's access-token URL, which is
///    then written back to the cache store.
///
/// The lock protecting the in-memory token is never held across an await, so
/// two callers that both see an expired token will both exchange. The last
/// exchange to finish wins; either token is valid.
pub struct TokenProvider {
    installation: String,
    access_tokens_url: String,
    app: Arc<dyn ApiClient>,
    cache: Arc<dyn CacheStore>,
    state: Mutex<TokenState>,
}

impl TokenProvider {
    /// Create a provider.
    ///
    /// # Arguments
    ///
    /// * `installation` - Installation (account) name, used for cache keys
    /// * `access_tokens_url` - Exchange endpoint from the installation payload
    /// * `app` - App-authenticated (JWT) client used for the exchange
    /// * `cache` - Store the token is persisted in
    pub fn new(
        installation: impl Into<String>,
        access_tokens_url: impl Into<String>,
        app: Arc<dyn ApiClient>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            installation: installation.into(),
            access_tokens_url: access_tokens_url.into(),
            app,
            cache,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Installation name this provider serves.
    pub fn installation(&self) -> &str {
        &self.installation
    }

    /// Exchange endpoint for new tokens.
    pub fn access_tokens_url(&self) -> &str {
        &self.access_tokens_url
    }

    /// Cache key holding the token string.
    pub fn token_key(&self) -> String {
        format!("token-{}", self.installation)
    }

    /// Cache key holding the token expiry as unix seconds.
    pub fn expiry_key(&self) -> String {
        format!("token-expires-{}", self.installation)
    }

    /// Get a token that is valid right now.
    ///
    /// # Errors
    ///
    /// Returns the exchange request's error unmodified, or
    /// `ApiError::UnexpectedPayload` if the exchange answer lacks `token` or
    /// a parseable `expires_at`.
    pub async fn token(&self) -> Result<String, ApiError> {
        if !self.state().loaded {
            self.load_from_cache().await;
        }

        let now = Utc::now().timestamp();
        if let Some(token) = self.state().token.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(token.token().to_string());
        }

        self.refresh().await
    }

    /// Exchange a new token regardless of the current one.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        info!(
            installation = %self.installation,
            "Exchanging installation access token"
        );

        let payload = self.app.post(&self.access_tokens_url, Params::new()).await?;
        let response: AccessTokenResponse = serde_json::from_value(payload).map_err(|e| {
            ApiError::unexpected_payload(format!("Invalid access token response: {}", e))
        })?;

        let token = InstallationToken::new(response.token, response.expires_at.timestamp());
        let value = token.token().to_string();

        self.state().token = Some(token.clone());
        self.store_in_cache(&token).await;

        Ok(value)
    }

    async fn load_from_cache(&self) {
        let token = self.read_cache(&self.token_key()).await;
        let expires_at = self
            .read_cache(&self.expiry_key())
            .await
            .and_then(|raw| match raw.trim().parse::<i64>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(
                        installation = %self.installation,
                        error = %e,
                        "Ignoring unparseable cached token expiry"
                    );
                    None
                }
            });

        let mut state = self.state();
        if state.loaded {
            return;
        }
        state.loaded = true;

        if let (Some(token), Some(expires_at)) = (token, expires_at) {
            debug!(
                installation = %self.installation,
                expires_at,
                "Loaded installation token from cache"
            );
            state.token.get_or_insert(InstallationToken::new(token, expires_at));
        }
    }

    async fn read_cache(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Token cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store_in_cache(&self, token: &InstallationToken) {
        let writes = [
            (self.token_key(), token.token().to_string()),
            (self.expiry_key(), token.expires_at().to_string()),
        ];

        for (key, value) in writes {
            if let Err(e) = self.cache.set(&key, value).await {
                warn!(key = %key, error = %e, "Token cache write failed");
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("installation", &self.installation)
            .field("access_tokens_url", &self.access_tokens_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
