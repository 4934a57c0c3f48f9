//! Tests for the installation token provider.

use super::*;
use crate::cache::InMemoryCache;
use crate::client::Method;
use crate::error::CacheError;
use crate::testing::MockApi;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;

const EXCHANGE_URL: &str = "https://api.github.com/app/installations/12083245/access_tokens";

fn future_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::hours(1)
}

fn exchange_api(token: &str, expires_at: DateTime<Utc>) -> Arc<MockApi> {
    let api = Arc::new(MockApi::new());
    api.respond_json(
        Method::Post,
        EXCHANGE_URL,
        json!({"token": token, "expires_at": expires_at.to_rfc3339()}),
    );
    api
}

fn provider(api: &Arc<MockApi>, cache: Arc<dyn CacheStore>) -> TokenProvider {
    TokenProvider::new("acme", EXCHANGE_URL, api.clone(), cache)
}

/// Cache store whose every operation fails.
struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable {
            message: "offline".to_string(),
        })
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
        Err(CacheError::Unavailable {
            message: "offline".to_string(),
        })
    }
}

mod exchange_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_exchanges_token() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        let token = provider.token().await.unwrap();

        assert_eq!(token, "ghs_fresh");
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].url, EXCHANGE_URL);
    }

    /// A token with a future expiry is reused instead of exchanged again.
    #[tokio::test]
    async fn test_unexpired_token_is_not_exchanged_again() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        provider.token().await.unwrap();
        provider.token().await.unwrap();
        let third = provider.token().await.unwrap();

        assert_eq!(third, "ghs_fresh");
        assert_eq!(api.call_count(Method::Post, EXCHANGE_URL), 1);
    }

    #[tokio::test]
    async fn test_expired_exchange_result_triggers_new_exchange() {
        let api = exchange_api("ghs_stale", Utc::now() - Duration::minutes(1));
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        provider.token().await.unwrap();
        provider.token().await.unwrap();

        assert_eq!(api.call_count(Method::Post, EXCHANGE_URL), 2);
    }

    #[tokio::test]
    async fn test_refresh_always_exchanges() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        provider.token().await.unwrap();
        provider.refresh().await.unwrap();

        assert_eq!(api.call_count(Method::Post, EXCHANGE_URL), 2);
    }

    #[tokio::test]
    async fn test_exchange_failure_propagates_unmodified() {
        let api = Arc::new(MockApi::new());
        api.fail(Method::Post, EXCHANGE_URL, 401, "Bad credentials");
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        let error = provider.token().await.unwrap_err();

        match error {
            ApiError::HttpError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_exchange_payload_is_unexpected_payload() {
        let api = Arc::new(MockApi::new());
        api.respond_json(
            Method::Post,
            EXCHANGE_URL,
            json!({"token": "ghs_x", "expires_at": "tomorrow"}),
        );
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        let result = provider.token().await;

        assert!(matches!(result, Err(ApiError::UnexpectedPayload { .. })));
    }
}

mod cache_tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_future_token_skips_exchange() {
        let api = Arc::new(MockApi::new());
        let cache = InMemoryCache::new();
        cache
            .set("token-acme", "ghs_cached".to_string())
            .await
            .unwrap();
        cache
            .set(
                "token-expires-acme",
                future_expiry().timestamp().to_string(),
            )
            .await
            .unwrap();
        let provider = provider(&api, Arc::new(cache));

        let token = provider.token().await.unwrap();

        assert_eq!(token, "ghs_cached");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cached_expired_token_is_replaced() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let cache = InMemoryCache::new();
        cache.set("token-acme", "ghs_old".to_string()).await.unwrap();
        cache
            .set("token-expires-acme", "1000".to_string())
            .await
            .unwrap();
        let provider = provider(&api, Arc::new(cache));

        let token = provider.token().await.unwrap();

        assert_eq!(token, "ghs_fresh");
        assert_eq!(api.call_count(Method::Post, EXCHANGE_URL), 1);
    }

    #[tokio::test]
    async fn test_exchange_writes_both_keys_back() {
        let expires_at = future_expiry();
        let api = exchange_api("ghs_fresh", expires_at);
        let cache = InMemoryCache::new();
        let provider = provider(&api, Arc::new(cache.clone()));

        provider.token().await.unwrap();

        assert_eq!(
            cache.get("token-acme").await.unwrap(),
            Some("ghs_fresh".to_string())
        );
        assert_eq!(
            cache.get("token-expires-acme").await.unwrap(),
            Some(expires_at.timestamp().to_string())
        );
    }

    #[tokio::test]
    async fn test_unparseable_cached_expiry_is_ignored() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let cache = InMemoryCache::new();
        cache.set("token-acme", "ghs_old".to_string()).await.unwrap();
        cache
            .set("token-expires-acme", "soon".to_string())
            .await
            .unwrap();
        let provider = provider(&api, Arc::new(cache));

        assert_eq!(provider.token().await.unwrap(), "ghs_fresh");
    }

    #[tokio::test]
    async fn test_failing_cache_falls_back_to_exchange() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let provider = provider(&api, Arc::new(BrokenCache));

        assert_eq!(provider.token().await.unwrap(), "ghs_fresh");
        assert_eq!(provider.token().await.unwrap(), "ghs_fresh");
        assert_eq!(api.call_count(Method::Post, EXCHANGE_URL), 1);
    }

    /// The cache is only consulted on first use.
    #[tokio::test]
    async fn test_cache_is_read_once() {
        let api = exchange_api("ghs_fresh", future_expiry());
        let cache = InMemoryCache::new();
        let provider = provider(&api, Arc::new(cache.clone()));

        provider.token().await.unwrap();
        cache
            .set("token-acme", "ghs_planted".to_string())
            .await
            .unwrap();

        assert_eq!(provider.token().await.unwrap(), "ghs_fresh");
    }

    #[test]
    fn test_cache_keys_use_installation_name() {
        let api = Arc::new(MockApi::new());
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        assert_eq!(provider.token_key(), "token-acme");
        assert_eq!(provider.expiry_key(), "token-expires-acme");
        assert_eq!(provider.installation(), "acme");
    }

    #[test]
    fn test_debug_output_has_no_token() {
        let api = Arc::new(MockApi::new());
        let provider = provider(&api, Arc::new(InMemoryCache::new()));

        let debug = format!("{:?}", provider);

        assert!(debug.contains("acme"));
        assert!(!debug.contains("ghs_"));
    }
}
