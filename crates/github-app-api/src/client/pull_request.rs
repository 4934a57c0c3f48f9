//! Pull request facade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::client::payload;
use crate::client::{
    is_absolute, ApiClient, HttpResponse, Label, Method, Paginator, Params, Repository,
};
use crate::error::ApiError;

/// Pull request state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    #[default]
    Open,
    Closed,
    All,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PullRequestState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "all" => Ok(Self::All),
            other => Err(ApiError::Configuration {
                message: format!(
                    "Unknown pull request state '{}', expected open, closed or all",
                    other
                ),
            }),
        }
    }
}

/// Filters for listing pull requests.
///
/// Unset fields are left to GitHub's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestsOptions {
    pub state: Option<PullRequestState>,
    /// `user:ref-name` of the head branch
    pub head: Option<String>,
    pub base: Option<String>,
    pub per_page: Option<u8>,
}

impl PullRequestsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: PullRequestState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn head(mut self, head: impl Into<String>) -> Self {
        self.head = Some(head.into());
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn per_page(mut self, per_page: u8) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Query parameters for the `pulls` listing.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(state) = self.state {
            params.insert("state".to_string(), json!(state.as_str()));
        }
        if let Some(head) = &self.head {
            params.insert("head".to_string(), json!(head));
        }
        if let Some(base) = &self.base {
            params.insert("base".to_string(), json!(base));
        }
        if let Some(per_page) = self.per_page {
            params.insert("per_page".to_string(), json!(per_page));
        }
        params
    }
}

/// A pull request of a repository.
///
/// Built either from a number alone or from an entry of the `pulls` listing.
/// The full pull request payload is fetched from
/// `repos/<full_name>/pulls/<number>` the first time a field the summary
/// lacks is needed, and shared between clones.
///
/// Relative request paths are scoped under the pull request, so
/// `pull.get("reviews", ..)` hits `repos/<full_name>/pulls/<number>/reviews`.
#[derive(Clone)]
pub struct PullRequest {
    repository: Repository,
    number: u64,
    summary: Option<Arc<Value>>,
    detail: Arc<OnceCell<Value>>,
    commit: Option<String>,
}

impl PullRequest {
    /// A pull request known only by number.
    pub fn new(repository: Repository, number: u64) -> Self {
        Self {
            repository,
            number,
            summary: None,
            detail: Arc::new(OnceCell::new()),
            commit: None,
        }
    }

    /// Wrap one entry of a `pulls` listing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if `number` is missing.
    pub fn from_list_response(repository: Repository, data: Value) -> Result<Self, ApiError> {
        let number = payload::required_u64(&data, "/number")?;

        Ok(Self {
            summary: Some(Arc::new(data)),
            ..Self::new(repository, number)
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// Title from whichever payload is already known, if any.
    pub fn title(&self) -> Option<&str> {
        self.known()
            .and_then(|data| payload::optional_str(data, "/title"))
    }

    fn known(&self) -> Option<&Value> {
        self.detail.get().or(self.summary.as_deref())
    }

    /// The full pull request payload, fetched once.
    pub async fn data(&self) -> Result<&Value, ApiError> {
        self.detail
            .get_or_try_init(|| self.get("", Params::new()))
            .await
    }

    /// Walk the files changed by this pull request.
    pub fn files(&self) -> Paginator<'_, Value> {
        self.get_all("files", Params::new())
    }

    /// Walk the review comments on this pull request.
    pub fn comments(&self) -> Paginator<'_, Value> {
        self.get_all("comments", Params::new())
    }

    /// A copy of this pull request pinned to `commit`.
    ///
    /// The copy reports `commit` from [`commit`](Self::commit) and attaches
    /// new comments to it.
    pub fn with_commit(&self, commit: impl Into<String>) -> Self {
        Self {
            commit: Some(commit.into()),
            ..self.clone()
        }
    }

    /// SHA of the commit this pull request is pinned to, defaulting to its
    /// head.
    pub async fn commit(&self) -> Result<String, ApiError> {
        if let Some(commit) = &self.commit {
            return Ok(commit.clone());
        }

        if let Some(sha) = self
            .known()
            .and_then(|data| payload::optional_str(data, "/head/sha"))
        {
            return Ok(sha.to_string());
        }

        let data = self.data().await?;
        Ok(payload::required_str(data, "/head/sha")?.to_string())
    }

    /// GitHub's mergeability verdict, e.g. `clean` or `blocked`.
    ///
    /// Only present in the full payload, so this always loads it.
    pub async fn mergeable_state(&self) -> Result<String, ApiError> {
        let data = self.data().await?;
        Ok(payload::required_str(data, "/mergeable_state")?.to_string())
    }

    /// Labels applied to the pull request.
    pub async fn labels(&self) -> Result<Vec<Label>, ApiError> {
        let data = match self.known() {
            Some(data) => data,
            None => self.data().await?,
        };

        match data.get("labels") {
            Some(Value::Array(items)) => items.iter().map(Label::from_api_response).collect(),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(ApiError::unexpected_payload("`labels` is not an array")),
        }
    }

    /// Add a review comment at `position` in the diff of `path`.
    ///
    /// The comment is attached to [`commit`](Self::commit).
    pub async fn add_comment(
        &self,
        body: &str,
        path: &str,
        position: u64,
    ) -> Result<Value, ApiError> {
        let mut data = Params::new();
        data.insert("body".to_string(), json!(body));
        data.insert("commit_id".to_string(), json!(self.commit().await?));
        data.insert("path".to_string(), json!(path));
        data.insert("position".to_string(), json!(position));

        self.post("comments", data).await
    }

    fn url(&self, path: &str) -> String {
        if is_absolute(path) || path.starts_with('/') {
            return path.to_string();
        }

        let base = format!(
            "repos/{}/pulls/{}",
            self.repository.full_name(),
            self.number
        );

        match path.trim_matches('/') {
            "" => base,
            path => format!("{}/{}", base, path),
        }
    }
}

#[async_trait]
impl ApiClient for PullRequest {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        self.repository
            .api()
            .request(method, &self.url(url), data)
            .await
    }
}

impl std::fmt::Debug for PullRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullRequest")
            .field("repository", &self.repository.full_name())
            .field("number", &self.number)
            .field("commit", &self.commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "pull_request_tests.rs"]
mod tests;
