//! GitHub API client for authenticated operations.
//!
//! The client has three request layers sharing one contract, [`ApiClient`]:
//!
//! - [`GitHubClient`] authenticates as the app itself with a freshly signed
//!   JWT per request and discovers the app's installations.
//! - [`Organization`] authenticates as one installation with an access token
//!   from its [`TokenProvider`](crate::auth::TokenProvider) and revalidates
//!   GETs against the response cache.
//! - [`TokenClient`] authenticates with a fixed token supplied by the caller.
//!
//! The domain facades ([`Repository`], [`Branch`], [`Tree`], [`PullRequest`]
//! and friends) are typed views over JSON payloads that issue their requests
//! through whichever layer created them.

mod app;
mod branch;
mod issue;
mod organization;
mod pagination;
mod payload;
mod pull_request;
mod repository;
mod response;
mod token_client;
mod transport;
mod tree;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::auth::{AppIdentity, GitHubAppId, JwtGenerator, RS256JwtGenerator};
use crate::cache::{CacheStore, NoopCache};
use crate::error::ApiError;

use app::AppConnection;

pub use branch::Branch;
pub use issue::Label;
pub use organization::Organization;
pub use pagination::{parse_link_header, Pagination, Paginator};
pub use pull_request::{PullRequest, PullRequestState, PullRequestsOptions};
pub use repository::{Repository, Tag};
pub use response::decode;
pub use token_client::TokenClient;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Params, ReqwestTransport};
pub use tree::{Directory, File, Tree};

pub(crate) use transport::{absolute_url, is_absolute};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default media type sent in the `Accept` header.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github.machine-man-preview+json";

/// Configuration for GitHub API client behavior.
///
/// # Examples
///
/// ```
/// use github_app_api::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_github_api_url("https://github.example.com/api/v3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// GitHub API base URL; relative request paths are resolved against it
    pub github_api_url: String,
    /// Media type sent in the `Accept` header
    pub accept: String,
    /// Lifetime of each app JWT (at most 10 minutes)
    pub jwt_expiration: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("github-app-api/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            github_api_url: DEFAULT_API_URL.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            jwt_expiration: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for client configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the GitHub API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    /// Set the `Accept` media type.
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Set the app JWT lifetime.
    pub fn with_jwt_expiration(mut self, expiration: Duration) -> Self {
        self.jwt_expiration = expiration;
        self
    }
}

/// Builder for constructing `ClientConfig` instances.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new configuration builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the GitHub API base URL.
    pub fn github_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.github_api_url = url.into();
        self
    }

    /// Set the `Accept` media type.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.config.accept = accept.into();
        self
    }

    /// Set the app JWT lifetime.
    pub fn jwt_expiration(mut self, expiration: Duration) -> Self {
        self.config.jwt_expiration = expiration;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Request contract shared by every authenticated layer and facade.
///
/// Implementors only provide [`request`](Self::request); the verb helpers
/// decode the response (204 becomes an empty object) and the `get_all`
/// helpers walk paginated listings.
///
/// `url` may be absolute (`http://` or `https://`) or relative to the
/// configured API base. `data` is sent as the query string for GET and as
/// the JSON body for every other verb.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Send an authenticated request and return the raw response.
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError>;

    /// Send a GET request and decode the response.
    async fn get(&self, url: &str, data: Params) -> Result<Value, ApiError> {
        decode(&self.request(Method::Get, url, data).await?)
    }

    /// Send a POST request and decode the response.
    async fn post(&self, url: &str, data: Params) -> Result<Value, ApiError> {
        decode(&self.request(Method::Post, url, data).await?)
    }

    /// Send a PUT request and decode the response.
    async fn put(&self, url: &str, data: Params) -> Result<Value, ApiError> {
        decode(&self.request(Method::Put, url, data).await?)
    }

    /// Send a PATCH request and decode the response.
    async fn patch(&self, url: &str, data: Params) -> Result<Value, ApiError> {
        decode(&self.request(Method::Patch, url, data).await?)
    }

    /// Send a DELETE request and decode the response.
    async fn delete(&self, url: &str, data: Params) -> Result<Value, ApiError> {
        decode(&self.request(Method::Delete, url, data).await?)
    }

    /// Walk every page of a listing, yielding the raw items.
    fn get_all(&self, url: &str, data: Params) -> Paginator<'_, Value>
    where
        Self: Sized,
    {
        Paginator::new(self, url, data)
    }

    /// Walk every page of a listing, turning each page into items with
    /// `mapper`.
    fn get_all_with<'a, T, F>(&'a self, url: &str, data: Params, mapper: F) -> Paginator<'a, T>
    where
        Self: Sized,
        F: FnMut(Value) -> Result<Vec<T>, ApiError> + Send + 'a,
    {
        Paginator::with_mapper(self, url, data, mapper)
    }
}

#[async_trait]
impl<C: ApiClient + ?Sized> ApiClient for Arc<C> {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        (**self).request(method, url, data).await
    }
}

/// Entry point: the app-authenticated API.
///
/// Every request carries a freshly signed JWT. The app's installations are
/// discovered on first use and memoized for the lifetime of the client (and
/// its clones).
///
/// # Examples
///
/// ```no_run
/// # use github_app_api::auth::AppIdentity;
/// # use github_app_api::client::GitHubClient;
/// # async fn example(pem: &str) -> Result<(), github_app_api::ApiError> {
/// let client = GitHubClient::builder(AppIdentity::from_pem(123456, pem)?).build()?;
///
/// let org = client.organization("acme").await?;
/// let mut repositories = org.repositories();
/// while let Some(repository) = repositories.try_next().await? {
///     println!("{}", repository.full_name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GitHubClient {
    app: Arc<AppConnection>,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheStore>,
    config: ClientConfig,
    organizations: Arc<OnceCell<Vec<Organization>>>,
}

impl GitHubClient {
    /// Create a new builder for constructing a GitHub client.
    pub fn builder(identity: AppIdentity) -> GitHubClientBuilder {
        GitHubClientBuilder::new(identity)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the app ID every JWT is issued for.
    pub fn app_id(&self) -> GitHubAppId {
        self.app.app_id()
    }

    /// List the organizations (installations) the app is installed on.
    ///
    /// The first call pages through `/app/installations`; later calls return
    /// the memoized list without touching the network. A failed discovery is
    /// not memoized.
    ///
    /// # Errors
    ///
    /// Returns the first request or payload error met while paging.
    pub async fn organizations(&self) -> Result<&[Organization], ApiError> {
        let organizations = self
            .organizations
            .get_or_try_init(|| self.discover_organizations())
            .await?;

        Ok(organizations.as_slice())
    }

    /// Find an installation by account name.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the app is not installed on `name`.
    pub async fn organization(&self, name: &str) -> Result<Organization, ApiError> {
        self.organizations()
            .await?
            .iter()
            .find(|org| org.name() == name)
            .cloned()
            .ok_or_else(|| {
                ApiError::not_found(format!(
                    "Unable to find this organization ({}), is this app installed there?",
                    name
                ))
            })
    }

    async fn discover_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        let app: Arc<dyn ApiClient> = self.app.clone();
        let transport = self.transport.clone();
        let cache = self.cache.clone();
        let api_url = self.config.github_api_url.clone();

        let organizations = Paginator::with_item_mapper(
            self.app.as_ref(),
            "/app/installations",
            Params::new(),
            move |installation| {
                Organization::from_installation(
                    installation,
                    app.clone(),
                    transport.clone(),
                    cache.clone(),
                    &api_url,
                )
            },
        )
        .try_collect()
        .await?;

        tracing::debug!(count = organizations.len(), "Discovered installations");

        Ok(organizations)
    }
}

#[async_trait]
impl ApiClient for GitHubClient {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        self.app.request(method, url, data).await
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("app_id", &self.app_id())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GitHubClient`].
///
/// Only the identity is required. Unset collaborators default to a
/// [`ReqwestTransport`] built from the configuration, a [`NoopCache`] and an
/// [`RS256JwtGenerator`] over the identity's key.
pub struct GitHubClientBuilder {
    identity: AppIdentity,
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    cache: Option<Arc<dyn CacheStore>>,
    jwt_generator: Option<Arc<dyn JwtGenerator>>,
}

impl GitHubClientBuilder {
    fn new(identity: AppIdentity) -> Self {
        Self {
            identity,
            config: ClientConfig::default(),
            transport: None,
            cache: None,
            jwt_generator: None,
        }
    }

    /// Use a custom configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Send requests through a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Persist installation tokens and conditional responses in `cache`.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sign app JWTs with a custom generator.
    pub fn jwt_generator(mut self, generator: Arc<dyn JwtGenerator>) -> Self {
        self.jwt_generator = Some(generator);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the JWT lifetime is zero or longer
    /// than 10 minutes, or if the default transport cannot be built.
    pub fn build(self) -> Result<GitHubClient, ApiError> {
        let jwt_generator = match self.jwt_generator {
            Some(generator) => generator,
            None => {
                let expiration = jwt_lifetime(self.config.jwt_expiration)?;
                Arc::new(RS256JwtGenerator::with_expiration(
                    self.identity.private_key().clone(),
                    expiration,
                ))
            }
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        let cache = self.cache.unwrap_or_else(|| Arc::new(NoopCache));

        let app = Arc::new(AppConnection::new(
            self.identity.app_id(),
            jwt_generator,
            transport.clone(),
            self.config.github_api_url.clone(),
        ));

        Ok(GitHubClient {
            app,
            transport,
            cache,
            config: self.config,
            organizations: Arc::new(OnceCell::new()),
        })
    }
}

fn jwt_lifetime(expiration: Duration) -> Result<chrono::Duration, ApiError> {
    let max = Duration::from_secs(crate::auth::jwt::MAX_JWT_EXPIRATION_SECS as u64);
    if expiration.is_zero() || expiration > max {
        return Err(ApiError::Configuration {
            message: format!(
                "JWT expiration must be between 1 second and 10 minutes, got {:?}",
                expiration
            ),
        });
    }

    chrono::Duration::from_std(expiration).map_err(|e| ApiError::Configuration {
        message: format!("Invalid JWT expiration: {}", e),
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
