//! GitHub App authentication types.
//!
//! This module provides the credentials used by the client:
//! - the app identity (app ID plus private key) and the JWTs minted from it
//! - installation access tokens exchanged with those JWTs
//! - the [`TokenProvider`] that owns an installation's token lifecycle

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod jwt;
pub mod tokens;

pub use jwt::{JwtGenerator, RS256JwtGenerator};
pub use tokens::TokenProvider;

use crate::error::ApiError;

// ============================================================================
// Core ID Types
// ============================================================================

/// GitHub App identifier assigned during app registration.
///
/// Used as the `iss` claim of every app JWT.
///
/// # Examples
///
/// ```
/// use github_app_api::auth::GitHubAppId;
///
/// let app_id = GitHubAppId::new(123456);
/// assert_eq!(app_id.as_u64(), 123456);
/// assert_eq!(app_id.to_string(), "123456");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitHubAppId(u64);

impl GitHubAppId {
    /// Create a new GitHub App ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GitHubAppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The app's identity: its ID and the key its JWTs are signed with.
///
/// Constructed once and never mutated. No JWT is stored alongside it; a new
/// one is minted for every app-level request.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    app_id: GitHubAppId,
    private_key: PrivateKey,
}

impl AppIdentity {
    /// Create an identity from an app ID and an already validated key.
    pub fn new(app_id: GitHubAppId, private_key: PrivateKey) -> Self {
        Self {
            app_id,
            private_key,
        }
    }

    /// Create an identity from an app ID and the contents of the app's `.pem` file.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidKey` if the PEM cannot be parsed as an RSA key.
    pub fn from_pem(app_id: u64, pem: &str) -> Result<Self, ApiError> {
        Ok(Self::new(GitHubAppId::new(app_id), PrivateKey::from_pem(pem)?))
    }

    /// Get the app ID.
    pub fn app_id(&self) -> GitHubAppId {
        self.app_id
    }

    /// Get the signing key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

// ============================================================================
// Token Types
// ============================================================================

/// JWT for GitHub App authentication.
///
/// The token string is never exposed in Debug output for security.
///
/// # Examples
///
/// ```
/// use github_app_api::auth::{JsonWebToken, GitHubAppId};
/// use chrono::{Utc, Duration};
///
/// let now = Utc::now();
/// let jwt = JsonWebToken::new(
///     "encoded.jwt.token".to_string(),
///     GitHubAppId::new(123),
///     now,
///     now + Duration::minutes(5),
/// );
///
/// assert!(!jwt.is_expired());
/// ```
#[derive(Clone)]
pub struct JsonWebToken {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    app_id: GitHubAppId,
}

impl JsonWebToken {
    /// Create a new JWT wrapper.
    ///
    /// # Arguments
    ///
    /// * `token` - The compact serialized JWT
    /// * `app_id` - The GitHub App ID this token represents
    /// * `issued_at` - The `iat` claim
    /// * `expires_at` - The `exp` claim
    pub fn new(
        token: String,
        app_id: GitHubAppId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            issued_at,
            expires_at,
            app_id,
        }
    }

    /// Get the token string for use in the `Authorization: Bearer` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the GitHub App ID this token represents.
    pub fn app_id(&self) -> GitHubAppId {
        self.app_id
    }

    /// Get when this token was issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Get when this token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is currently expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Get the validity window (`exp - iat`).
    pub fn lifetime(&self) -> Duration {
        self.expires_at - self.issued_at
    }
}

// Security: Don't expose token in debug output
impl std::fmt::Debug for JsonWebToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebToken")
            .field("app_id", &self.app_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Installation access token with its expiry as unix seconds.
///
/// A token is only usable while it is non-empty and its expiry lies strictly
/// in the future.
///
/// # Examples
///
/// ```
/// use github_app_api::auth::InstallationToken;
///
/// let token = InstallationToken::new("ghs_abc".to_string(), 1_700_000_600);
///
/// assert!(token.is_valid_at(1_700_000_000));
/// assert!(!token.is_valid_at(1_700_000_600));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct InstallationToken {
    token: String,
    expires_at: i64,
}

impl InstallationToken {
    /// Create a new installation token.
    pub fn new(token: String, expires_at: i64) -> Self {
        Self { token, expires_at }
    }

    /// Get the token string for use in the `Authorization: token` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the expiry as unix seconds.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Check whether the token can be used at `now` (unix seconds).
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.token.is_empty() && self.expires_at > now
    }

    /// Check whether the token can be used right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now().timestamp())
    }
}

// Security: Redact token in debug output
impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Signing Types
// ============================================================================

/// Private key for JWT signing.
///
/// Stores the PEM bytes of an RSA key. The key data is never exposed in Debug
/// output for security.
#[derive(Clone)]
pub struct PrivateKey {
    key_data: Vec<u8>,
    algorithm: KeyAlgorithm,
}

impl PrivateKey {
    /// Create a new private key without validating it.
    ///
    /// Prefer [`PrivateKey::from_pem`], which rejects unusable keys up front.
    pub fn new(key_data: Vec<u8>, algorithm: KeyAlgorithm) -> Self {
        Self {
            key_data,
            algorithm,
        }
    }

    /// Get the key data.
    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }

    /// Get the signing algorithm.
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }
}

// Security: Don't expose key data in debug output
impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .field("key_data", &"<REDACTED>")
            .finish()
    }
}

/// Key algorithm for JWT signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    RS256,
}

/// JWT claims for GitHub App authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer (the app ID, as a string)
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
