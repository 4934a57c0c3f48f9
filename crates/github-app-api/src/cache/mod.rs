//! External cache stores.
//!
//! The client persists two kinds of entries through a [`CacheStore`]:
//! installation tokens (`token-<org>` / `token-expires-<org>`) and serialized
//! HTTP responses keyed by a SHA-1 digest of the request (see
//! [`ConditionalCache`]). The store is a black box; every failure it reports
//! is treated as a cache miss by the callers in this crate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::CacheError;

mod conditional;

pub use conditional::{cache_key, ConditionalCache};

/// Key/value store used for tokens and conditional responses.
///
/// Implementations must be safe to share between organizations; the same
/// store instance is handed to every installation of a client.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

/// Cache that never holds anything.
///
/// Every lookup misses and every write is discarded. This is the default
/// store, so a client without a cache needs no special casing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Process-local cache backed by a hash map.
///
/// Entries never expire; token validity and ETag revalidation decide whether a
/// stored value is still usable.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryCache {
    /// Create an empty in-memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CacheError::OperationFailed {
                message: format!("Failed to acquire read lock: {}", e),
            })?;

        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::OperationFailed {
                message: format!("Failed to acquire write lock: {}", e),
            })?;

        entries.insert(key.to_string(), value);

        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
