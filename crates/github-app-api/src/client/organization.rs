//! Installation-scoped request layer.
//!
//! An [`Organization`] is one installation of the app. Its requests carry the
//! installation's access token and its GETs are revalidated against the
//! response cache.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::TokenProvider;
use crate::cache::{CacheStore, ConditionalCache};
use crate::client::payload;
use crate::client::{
    absolute_url, ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, Paginator, Params,
    Repository,
};
use crate::error::ApiError;

struct OrganizationInner {
    data: Value,
    name: String,
    api_url: String,
    transport: Arc<dyn HttpTransport>,
    cache: ConditionalCache,
    tokens: TokenProvider,
}

/// An installation of the app on an account.
///
/// Cheap to clone; clones share the token provider, so a token exchanged by
/// one clone is reused by all of them.
#[derive(Clone)]
pub struct Organization {
    inner: Arc<OrganizationInner>,
}

impl Organization {
    /// Build an organization from an entry of `/app/installations`.
    ///
    /// # Arguments
    ///
    /// * `data` - The installation payload
    /// * `app` - App-authenticated client used for token exchange
    /// * `transport` - Transport for installation requests
    /// * `cache` - Store for installation tokens and conditional responses
    /// * `api_url` - Base URL for relative request paths
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if `account.login` or
    /// `access_tokens_url` is missing.
    pub fn from_installation(
        data: Value,
        app: Arc<dyn ApiClient>,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheStore>,
        api_url: &str,
    ) -> Result<Self, ApiError> {
        let name = payload::required_str(&data, "/account/login")?.to_string();
        let access_tokens_url = payload::required_str(&data, "/access_tokens_url")?.to_string();

        let tokens = TokenProvider::new(name.clone(), access_tokens_url, app, cache.clone());

        Ok(Self {
            inner: Arc::new(OrganizationInner {
                data,
                name,
                api_url: api_url.to_string(),
                transport,
                cache: ConditionalCache::new(cache),
                tokens,
            }),
        })
    }

    /// Account login the app is installed on.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Installation ID, when the payload has one.
    pub fn id(&self) -> Option<u64> {
        self.inner.data.get("id").and_then(Value::as_u64)
    }

    /// Endpoint installation tokens are exchanged at.
    pub fn access_tokens_url(&self) -> &str {
        self.inner.tokens.access_tokens_url()
    }

    /// The raw installation payload.
    pub fn data(&self) -> &Value {
        &self.inner.data
    }

    /// A currently valid installation token.
    pub async fn token(&self) -> Result<String, ApiError> {
        self.inner.tokens.token().await
    }

    /// Walk the repositories this installation can access.
    pub fn repositories(&self) -> Paginator<'_, Repository> {
        let api: Arc<dyn ApiClient> = Arc::new(self.clone());

        Paginator::with_mapper(
            self,
            "installation/repositories",
            Params::new(),
            move |page| match page.get("repositories") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| Repository::from_api_response(api.clone(), item.clone()))
                    .collect(),
                Some(Value::Null) | None => Ok(Vec::new()),
                Some(_) => Err(ApiError::unexpected_payload(
                    "`repositories` is not an array",
                )),
            },
        )
    }

    /// Fetch one repository of this account by name.
    pub async fn repository(&self, name: &str) -> Result<Repository, ApiError> {
        Repository::from_name(Arc::new(self.clone()), self.name(), name).await
    }
}

#[async_trait]
impl ApiClient for Organization {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        let token = self.inner.tokens.token().await?;

        let request = HttpRequest::new(method, absolute_url(&self.inner.api_url, url))
            .with_header("Authorization", format!("token {}", token))
            .with_data(data);

        self.inner
            .cache
            .send(self.inner.transport.as_ref(), request)
            .await
    }
}

impl std::fmt::Debug for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organization")
            .field("name", &self.inner.name)
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "organization_tests.rs"]
mod tests;
