//! ETag revalidation for GET requests.

use sha1::{Digest, Sha1};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CacheStore, NoopCache};
use crate::client::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::ApiError;

/// Compute the cache key of a request.
///
/// The key is the hex SHA-1 of `"<METHOD>_<url>_<query>"`, where `<query>` is
/// the JSON serialization of the query parameters (keys in sorted order) or
/// empty when there are none.
pub fn cache_key(request: &HttpRequest) -> String {
    let query = request
        .query
        .as_ref()
        .and_then(|q| serde_json::to_string(q).ok())
        .unwrap_or_default();

    let mut hasher = Sha1::new();
    hasher.update(format!("{}_{}_{}", request.method, request.url, query).as_bytes());
    hex::encode(hasher.finalize())
}

/// Wraps a transport with conditional GET caching.
///
/// For every GET the stored response (if any) supplies `If-None-Match`. A
/// live 304 is answered with the stored response; any other live response is
/// authoritative and is stored when it carries an `ETag`. Other verbs go
/// straight to the transport.
///
/// Store failures never fail the request: an unreadable entry is a miss and a
/// failed write is logged and dropped.
#[derive(Clone)]
pub struct ConditionalCache {
    store: Arc<dyn CacheStore>,
}

impl ConditionalCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Send `request` through `transport`, revalidating GETs.
    pub async fn send(
        &self,
        transport: &dyn HttpTransport,
        mut request: HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        if request.method != Method::Get {
            return transport.send(request).await;
        }

        let key = cache_key(&request);
        let cached = self.lookup(&key).await;

        if let Some(etag) = cached.as_ref().and_then(|c| c.etag()) {
            request = request.with_header("If-None-Match", etag);
        }

        let url = request.url.clone();
        let response = transport.send(request).await?;

        if response.is_not_modified() {
            if let Some(cached) = cached {
                debug!(url = %url, "Not modified, serving cached response");
                return Ok(cached);
            }
        }

        if response.etag().is_some() {
            self.remember(&key, &response).await;
        }

        Ok(response)
    }

    async fn lookup(&self, key: &str) -> Option<HttpResponse> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Response cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unparseable cached response");
                None
            }
        }
    }

    async fn remember(&self, key: &str, response: &HttpResponse) {
        let serialized = match serde_json::to_string(response) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize response for cache");
                return;
            }
        };

        match self.store.set(key, serialized).await {
            Ok(()) => debug!(key, "Stored response in cache"),
            Err(e) => warn!(key, error = %e, "Response cache write failed"),
        }
    }
}

impl Default for ConditionalCache {
    fn default() -> Self {
        Self::new(Arc::new(NoopCache))
    }
}

impl std::fmt::Debug for ConditionalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "conditional_tests.rs"]
mod tests;
