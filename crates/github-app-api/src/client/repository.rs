//! Repository facade.
//!
//! A [`Repository`] is a typed view over a `repos/<owner>/<name>` payload.
//! Relative request paths are scoped under the repository, so
//! `repository.get("branches", ..)` hits `repos/<full_name>/branches`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::client::payload;
use crate::client::{
    is_absolute, ApiClient, Branch, HttpResponse, Method, Paginator, Params, PullRequest,
    PullRequestsOptions,
};
use crate::error::ApiError;

/// A GitHub repository.
///
/// Cheap to clone; the payload is shared between clones.
#[derive(Clone)]
pub struct Repository {
    api: Arc<dyn ApiClient>,
    data: Arc<Value>,
    name: String,
    full_name: String,
}

impl Repository {
    /// Fetch `repos/<owner>/<name>` through `api`.
    pub async fn from_name(
        api: Arc<dyn ApiClient>,
        owner: &str,
        name: &str,
    ) -> Result<Self, ApiError> {
        let data = api
            .get(&format!("repos/{}/{}", owner, name), Params::new())
            .await?;

        Self::from_api_response(api, data)
    }

    /// Wrap an already fetched repository payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if `name` or `full_name` is
    /// missing.
    pub fn from_api_response(api: Arc<dyn ApiClient>, data: Value) -> Result<Self, ApiError> {
        let name = payload::required_str(&data, "/name")?.to_string();
        let full_name = payload::required_str(&data, "/full_name")?.to_string();

        Ok(Self {
            api,
            data: Arc::new(data),
            name,
            full_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Repository description, empty when unset.
    pub fn description(&self) -> &str {
        payload::optional_str(&self.data, "/description").unwrap_or_default()
    }

    pub fn is_private(&self) -> bool {
        payload::bool_or_false(&self.data, "/private")
    }

    pub fn is_public(&self) -> bool {
        !self.is_private()
    }

    pub fn is_fork(&self) -> bool {
        payload::bool_or_false(&self.data, "/fork")
    }

    pub fn is_archived(&self) -> bool {
        payload::bool_or_false(&self.data, "/archived")
    }

    /// The raw repository payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The client this repository sends its requests through.
    pub(crate) fn api(&self) -> &Arc<dyn ApiClient> {
        &self.api
    }

    fn url(&self, path: &str) -> String {
        if is_absolute(path) || path.starts_with('/') {
            return path.to_string();
        }

        match path.trim_matches('/') {
            "" => format!("repos/{}", self.full_name),
            path => format!("repos/{}/{}", self.full_name, path),
        }
    }

    /// Walk the branches of this repository.
    ///
    /// Branches start out with the list summary only; their detail is
    /// fetched from `repos/<full_name>/branches/<name>` on first use.
    pub fn branches(&self) -> Paginator<'_, Branch> {
        let api = self.api.clone();
        let full_name = self.full_name.clone();

        Paginator::with_item_mapper(self, "branches", Params::new(), move |item| {
            let url = format!(
                "repos/{}/branches/{}",
                full_name,
                payload::required_str(&item, "/name")?
            );
            Branch::from_list_response(api.clone(), item, url)
        })
    }

    /// The repository's default branch, fully loaded.
    pub async fn default_branch(&self) -> Result<Branch, ApiError> {
        let name = payload::required_str(&self.data, "/default_branch")?;
        self.branch(name).await
    }

    /// Fetch one branch by name.
    pub async fn branch(&self, name: &str) -> Result<Branch, ApiError> {
        let data = self
            .get(&format!("branches/{}", name), Params::new())
            .await?;

        Branch::from_api_response(self.api.clone(), data)
    }

    /// Walk the pull requests matching `options`.
    pub fn pull_requests(&self, options: PullRequestsOptions) -> Paginator<'_, PullRequest> {
        let repository = self.clone();

        Paginator::with_item_mapper(self, "pulls", options.to_params(), move |item| {
            PullRequest::from_list_response(repository.clone(), item)
        })
    }

    /// A pull request by number.
    ///
    /// Nothing is fetched until a detail accessor needs it.
    pub fn pull_request(&self, number: u64) -> PullRequest {
        PullRequest::new(self.clone(), number)
    }

    /// Walk the tags of this repository.
    pub fn tags(&self) -> Paginator<'_, Tag> {
        Paginator::with_item_mapper(self, "tags", Params::new(), Tag::from_list_response)
    }
}

#[async_trait]
impl ApiClient for Repository {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        self.api.request(method, &self.url(url), data).await
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// A tag from the `tags` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    name: String,
    commit: TagCommit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TagCommit {
    sha: String,
}

impl Tag {
    /// Build a tag from one item of the `tags` listing.
    pub fn from_list_response(data: Value) -> Result<Self, ApiError> {
        serde_json::from_value(data)
            .map_err(|e| ApiError::unexpected_payload(format!("invalid tag: {}", e)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SHA of the tagged commit.
    pub fn commit(&self) -> &str {
        &self.commit.sha
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
