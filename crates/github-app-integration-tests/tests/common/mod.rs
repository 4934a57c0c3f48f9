//! Common test utilities for github-app-api integration tests
//!
//! This module provides:
//! - A GitHub App identity backed by the test key fixture
//! - Client construction against a `wiremock` server
//! - Mounting helpers for installation discovery and token exchange

#![allow(dead_code)]

use github_app_api::cache::CacheStore;
use github_app_api::{AppIdentity, ClientConfig, GitHubClient};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const APP_ID: u64 = 42;

const TEST_KEY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../github-app-api/tests/fixtures/test-app-key.pem"
));

/// Token expiry far enough out that no test ever refreshes it.
pub const FAR_FUTURE: &str = "2099-01-01T00:00:00Z";

pub fn identity() -> AppIdentity {
    AppIdentity::from_pem(APP_ID, TEST_KEY).expect("fixture key should parse")
}

/// Build an app client that talks to `server` and stores into `cache`.
pub fn client(server: &MockServer, cache: Arc<dyn CacheStore>) -> GitHubClient {
    GitHubClient::builder(identity())
        .config(ClientConfig::default().with_github_api_url(server.uri()))
        .cache(cache)
        .build()
        .expect("client should build")
}

/// An `/app/installations` entry for `login`.
pub fn installation(server: &MockServer, id: u64, login: &str) -> Value {
    json!({
        "id": id,
        "account": {"login": login, "type": "Organization"},
        "access_tokens_url": format!("{}/app/installations/{}/access_tokens", server.uri(), id),
    })
}

/// Serve `installations` as a single page of `/app/installations`.
///
/// Only JWT-authenticated requests match.
pub async fn mount_installations(server: &MockServer, installations: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/app/installations"))
        .and(header_regex("authorization", r"^Bearer [^.]+\.[^.]+\.[^.]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(installations)))
        .mount(server)
        .await;
}

/// Answer the token exchange for installation `id` with `token`.
///
/// The mock expects exactly `times` exchanges.
pub async fn mount_token_exchange(server: &MockServer, id: u64, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/app/installations/{}/access_tokens", id)))
        .and(header_regex("authorization", r"^Bearer "))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": token,
            "expires_at": FAR_FUTURE,
        })))
        .expect(times)
        .mount(server)
        .await;
}
