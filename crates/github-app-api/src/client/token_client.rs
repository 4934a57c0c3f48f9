//! Request layer authenticated with a caller-supplied token.

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::{
    absolute_url, ApiClient, ClientConfig, HttpRequest, HttpResponse, HttpTransport, Method,
    Params, ReqwestTransport,
};
use crate::error::ApiError;

/// Client for a fixed personal access (or installation) token.
///
/// Requests carry `Authorization: token <token>` and are sent straight to the
/// transport without conditional caching.
///
/// # Examples
///
/// ```no_run
/// # use github_app_api::client::{ApiClient, ClientConfig, Params, TokenClient};
/// # async fn example() -> Result<(), github_app_api::ApiError> {
/// let client = TokenClient::new("ghp_example", &ClientConfig::default())?;
/// let user = client.get("user", Params::new()).await?;
/// println!("{}", user["login"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TokenClient {
    token: String,
    api_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl TokenClient {
    /// Create a client using a [`ReqwestTransport`] built from `config`.
    pub fn new(token: impl Into<String>, config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(
            token,
            config.github_api_url.clone(),
            transport,
        ))
    }

    /// Create a client sending through `transport`.
    pub fn with_transport(
        token: impl Into<String>,
        api_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            token: token.into(),
            api_url: api_url.into(),
            transport,
        }
    }
}

#[async_trait]
impl ApiClient for TokenClient {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest::new(method, absolute_url(&self.api_url, url))
            .with_header("Authorization", format!("token {}", self.token))
            .with_data(data);

        self.transport.send(request).await
    }
}

// Security: Don't expose token in debug output
impl std::fmt::Debug for TokenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClient")
            .field("api_url", &self.api_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "token_client_tests.rs"]
mod tests;
