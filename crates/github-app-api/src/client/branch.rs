//! Branch facade.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::client::payload;
use crate::client::{
    is_absolute, ApiClient, Directory, File, HttpResponse, Method, Params, Tree,
};
use crate::error::ApiError;

/// A branch of a repository.
///
/// A branch is either built from a full `branches/<name>` payload, or from an
/// entry of the `branches` listing together with the URL of its detail. In
/// the latter case the detail (head commit, `_links`) is fetched on first use
/// and shared between clones, as is the tree of the head commit.
///
/// Relative request paths are resolved against the branch's `_links.self`,
/// so `branch.get("protection", ..)` hits `<self>/protection`.
#[derive(Clone)]
pub struct Branch {
    api: Arc<dyn ApiClient>,
    summary: Arc<Value>,
    url: String,
    detail: Arc<OnceCell<Value>>,
    tree: Arc<OnceCell<Tree>>,
    name: String,
    commit: String,
}

impl Branch {
    /// Wrap a full `branches/<name>` payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if `name` or `commit.sha` is
    /// missing.
    pub fn from_api_response(api: Arc<dyn ApiClient>, data: Value) -> Result<Self, ApiError> {
        let mut branch = Self::from_summary(api, data.clone(), String::new())?;
        branch.detail = Arc::new(OnceCell::new_with(Some(data)));
        Ok(branch)
    }

    /// Wrap one entry of a `branches` listing.
    ///
    /// `url` is where the full branch payload is fetched from. An empty URL
    /// leaves the branch without a detail source, so detail accessors fail
    /// with `ApiError::Logic`.
    pub fn from_list_response(
        api: Arc<dyn ApiClient>,
        data: Value,
        url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::from_summary(api, data, url.into())
    }

    fn from_summary(api: Arc<dyn ApiClient>, data: Value, url: String) -> Result<Self, ApiError> {
        let name = payload::required_str(&data, "/name")?.to_string();
        let commit = payload::required_str(&data, "/commit/sha")?.to_string();

        Ok(Self {
            api,
            summary: Arc::new(data),
            url,
            detail: Arc::new(OnceCell::new()),
            tree: Arc::new(OnceCell::new()),
            name,
            commit,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SHA of the commit the branch points at.
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// The full branch payload, fetched once.
    pub async fn data(&self) -> Result<&Value, ApiError> {
        self.detail
            .get_or_try_init(|| async {
                if self.url.is_empty() {
                    return Err(ApiError::Logic {
                        message: "Unable to get the branch information, no URL has been provided"
                            .to_string(),
                    });
                }

                self.api.get(&self.url, Params::new()).await
            })
            .await
    }

    /// The git commit object at the head of the branch.
    pub async fn head(&self) -> Result<&Value, ApiError> {
        let data = self.data().await?;

        match data.pointer("/commit/commit") {
            Some(head @ Value::Object(_)) => Ok(head),
            _ => Err(ApiError::unexpected_payload(
                "missing or invalid field `/commit/commit` (expected an object)",
            )),
        }
    }

    /// Committer date of the head commit.
    pub async fn date(&self) -> Result<DateTime<Utc>, ApiError> {
        let head = self.head().await?;
        let date = payload::required_str(head, "/committer/date")?;

        DateTime::parse_from_rfc3339(date)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| {
                ApiError::unexpected_payload(format!("invalid committer date '{}': {}", date, e))
            })
    }

    /// Branch protection settings; an empty object for unprotected branches.
    pub async fn protection(&self) -> Result<Value, ApiError> {
        let known = self.detail.get().unwrap_or(self.summary.as_ref());
        if !payload::bool_or_false(known, "/protected") {
            return Ok(json!({}));
        }

        self.get("protection", Params::new()).await
    }

    /// The tree of the head commit, fetched once.
    pub async fn tree(&self) -> Result<&Tree, ApiError> {
        self.tree
            .get_or_try_init(|| async {
                let url = payload::required_str(self.head().await?, "/tree/url")?;
                let data = self.api.get(url, Params::new()).await?;
                Tree::from_api_response(self.api.clone(), data)
            })
            .await
    }

    pub async fn directories(&self) -> Result<Vec<Directory>, ApiError> {
        self.tree().await?.directories()
    }

    pub async fn directory(&self, name: &str) -> Result<Directory, ApiError> {
        self.tree().await?.directory(name)
    }

    pub async fn has_directory(&self, name: &str) -> Result<bool, ApiError> {
        self.tree().await?.has_directory(name)
    }

    pub async fn files(&self) -> Result<Vec<File>, ApiError> {
        self.tree().await?.files()
    }

    pub async fn file(&self, name: &str) -> Result<File, ApiError> {
        self.tree().await?.file(name)
    }

    pub async fn has_file(&self, name: &str) -> Result<bool, ApiError> {
        self.tree().await?.has_file(name)
    }

    async fn url(&self, path: &str) -> Result<String, ApiError> {
        if is_absolute(path) || path.starts_with('/') {
            return Ok(path.to_string());
        }

        let base = payload::required_str(self.data().await?, "/_links/self")?;

        Ok(match path.trim_matches('/') {
            "" => base.to_string(),
            path => format!("{}/{}", base, path),
        })
    }
}

#[async_trait]
impl ApiClient for Branch {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.url(url).await?;
        self.api.request(method, &url, data).await
    }
}

impl std::fmt::Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("name", &self.name)
            .field("commit", &self.commit)
            .field("loaded", &self.detail.initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "branch_tests.rs"]
mod tests;
