//! Error types for GitHub App API operations.
//!
//! All request, decoding and facade failures surface as [`ApiError`]. Cache
//! store implementations report [`CacheError`]; the request pipeline treats
//! those as non-fatal and falls back to uncached behaviour.

use thiserror::Error;

/// Errors produced by the API client and its domain facades.
///
/// Nothing in this crate retries: every variant is returned to the immediate
/// caller. Transport failures (non-2xx statuses and HTTP client errors) are
/// passed through from the [`HttpTransport`](crate::client::HttpTransport)
/// unmodified.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The app private key could not be parsed or used for signing.
    #[error("Invalid private key: {message}")]
    InvalidKey { message: String },

    /// A response body was not valid JSON.
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// A lookup found nothing (organization, directory, file).
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The server truncated a tree listing, so a complete search is impossible.
    #[error("Truncated response: {message}")]
    TruncatedResponse { message: String },

    /// An operation was attempted without a required prerequisite.
    #[error("Logic error: {message}")]
    Logic { message: String },

    /// A payload decoded fine but lacks a field the caller relies on.
    #[error("Unexpected payload: {message}")]
    UnexpectedPayload { message: String },

    /// The remote API answered with a 4xx/5xx status.
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// HTTP client error (network, TLS, timeout, etc.).
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Client construction failed because of invalid settings.
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

impl ApiError {
    /// Check whether this error is a lookup miss.
    ///
    /// The `has_*` existence checks on trees turn exactly this case into
    /// `false` and propagate everything else.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            Self::HttpClient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub(crate) fn unexpected_payload(message: impl Into<String>) -> Self {
        Self::UnexpectedPayload {
            message: message.into(),
        }
    }
}

/// Errors during cache store operations.
///
/// Cache errors are non-fatal: token lookups fall back to a fresh exchange and
/// conditional requests fall back to an unconditional round-trip.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A cache operation failed for a specific reason.
    #[error("Cache operation failed: {message}")]
    OperationFailed { message: String },

    /// The cache is unavailable or unreachable.
    #[error("Cache unavailable: {message}")]
    Unavailable { message: String },

    /// Failed to serialize or deserialize cached data.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
