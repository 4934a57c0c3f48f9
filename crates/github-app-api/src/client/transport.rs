//! HTTP transport abstraction.
//!
//! Every outgoing call is described by an [`HttpRequest`] and answered by an
//! [`HttpResponse`]. The [`HttpTransport`] trait is the seam between the
//! request pipeline (authentication, caching, pagination) and the wire, so
//! the pipeline can be exercised against scripted transports in tests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::client::ClientConfig;
use crate::error::ApiError;

/// Request parameters: the query string for GET, the JSON body otherwise.
pub type Params = serde_json::Map<String, Value>;

/// HTTP verbs used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully resolved outgoing request.
///
/// Built fresh for every call. `query` is only ever set for GET and `json`
/// only for the other verbs.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: Option<Params>,
    pub json: Option<Params>,
}

impl HttpRequest {
    /// Create a request with no headers and no parameters.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            query: None,
            json: None,
        }
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach request parameters.
    ///
    /// GET sends them as the query string; every other verb sends them as a
    /// JSON body. Empty parameters are dropped.
    pub fn with_data(mut self, data: Params) -> Self {
        if data.is_empty() {
            return self;
        }

        match self.method {
            Method::Get => self.query = Some(data),
            _ => self.json = Some(data),
        }
        self
    }

    /// Get a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Flatten the query parameters into `key=value` pairs.
    ///
    /// Strings are sent verbatim, numbers and booleans in their JSON form,
    /// arrays as one pair per element and nested objects as JSON text. Nulls
    /// are skipped.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(query) = &self.query {
            for (key, value) in query {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            if let Some(v) = query_value(item) {
                                pairs.push((key.clone(), v));
                            }
                        }
                    }
                    other => {
                        if let Some(v) = query_value(other) {
                            pairs.push((key.clone(), v));
                        }
                    }
                }
            }
        }

        pairs
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A response as seen by the request pipeline.
///
/// Also the serialized form of a conditional cache entry, so it carries the
/// full header list and the raw body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header in arrival order, ignoring ASCII case.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let name = name.to_string();
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(&name))
            .map(|(_, v)| v.as_str())
    }

    /// The `ETag` header, if present.
    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Sends requests over the wire.
///
/// Implementations return 1xx-3xx answers (including 304) as responses and
/// report 4xx/5xx as [`ApiError::HttpError`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport honouring the configured user agent, accept media
    /// type and timeout.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the accept header is not a valid
    /// header value, or `ApiError::HttpClient` if the client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let accept = HeaderValue::from_str(&config.accept).map_err(|e| ApiError::Configuration {
            message: format!("Invalid accept header '{}': {}", config.accept, e),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, accept);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let pairs = request.query_pairs();
        let mut builder = self.client.request(request.method.into(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !pairs.is_empty() {
            builder = builder.query(&pairs);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        debug!(status = status.as_u16(), url = %request.url, "Received response");

        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

/// Check whether `url` already names a scheme.
pub(crate) fn is_absolute(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Resolve `url` against the API base.
///
/// URLs starting with `http://` or `https://` are used as given; anything
/// else is appended to `base` with exactly one `/` between them.
pub(crate) fn absolute_url(base: &str, url: &str) -> String {
    if is_absolute(url) {
        return url.to_string();
    }

    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
