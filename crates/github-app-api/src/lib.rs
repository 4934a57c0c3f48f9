//! # GitHub App API
//!
//! Typed client for the GitHub REST API as a GitHub App.
//!
//! This crate provides:
//! - App authentication with short-lived RS256 JWTs
//! - Per-installation access tokens, exchanged on demand and shared through a
//!   pluggable [`CacheStore`](cache::CacheStore)
//! - ETag revalidation of GET requests against the same store
//! - Lazy `Link`-header pagination
//! - Domain facades for repositories, branches, trees, pull requests and tags
//!
//! # Examples
//!
//! ## Listing repositories of an installation
//!
//! ```rust,no_run
//! use github_app_api::auth::AppIdentity;
//! use github_app_api::cache::InMemoryCache;
//! use github_app_api::GitHubClient;
//! use std::sync::Arc;
//!
//! # async fn example(pem: &str) -> Result<(), github_app_api::ApiError> {
//! let client = GitHubClient::builder(AppIdentity::from_pem(123456, pem)?)
//!     .cache(Arc::new(InMemoryCache::new()))
//!     .build()?;
//!
//! for org in client.organizations().await? {
//!     let mut repositories = org.repositories();
//!     while let Some(repository) = repositories.try_next().await? {
//!         println!("{}", repository.full_name());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading a file from the default branch
//!
//! ```rust,no_run
//! # async fn example(org: github_app_api::Organization) -> Result<(), github_app_api::ApiError> {
//! let repository = org.repository("widgets").await?;
//! let branch = repository.default_branch().await?;
//!
//! if branch.has_file("Cargo.toml").await? {
//!     let manifest = branch.file("Cargo.toml").await?.text().await?;
//!     println!("{}", manifest);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, CacheError};

pub use auth::{AppIdentity, GitHubAppId, InstallationToken, TokenProvider};
pub use cache::{CacheStore, InMemoryCache, NoopCache};
pub use client::{
    ApiClient, Branch, ClientConfig, Directory, File, GitHubClient, Label, Organization,
    Paginator, PullRequest, PullRequestState, PullRequestsOptions, Repository, Tag, TokenClient,
    Tree,
};
