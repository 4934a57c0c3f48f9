//! Tests for the branch facade.

use super::*;
use crate::testing::MockApi;
use chrono::TimeZone;

const SELF_URL: &str = "https://api.github.com/repos/acme/widgets/branches/main";
const TREE_URL: &str = "https://api.github.com/repos/acme/widgets/git/trees/tree999";

fn full(protected: bool, truncated_tree: bool) -> (Value, Value) {
    let branch = json!({
        "name": "main",
        "protected": protected,
        "commit": {
            "sha": "aaa111",
            "commit": {
                "message": "Release 1.0",
                "committer": {"name": "Octo Cat", "date": "2024-03-01T12:30:00Z"},
                "tree": {"sha": "tree999", "url": TREE_URL},
            },
        },
        "_links": {"self": SELF_URL, "html": "https://github.com/acme/widgets/tree/main"},
    });
    let tree = json!({
        "sha": "tree999",
        "truncated": truncated_tree,
        "tree": [
            {"path": "src", "mode": "040000", "type": "tree", "sha": "s1",
             "url": "https://api.github.com/repos/acme/widgets/git/trees/s1"},
            {"path": "Cargo.toml", "mode": "100644", "type": "blob", "sha": "c1", "size": 310,
             "url": "https://api.github.com/repos/acme/widgets/git/blobs/c1"},
        ],
    });
    (branch, tree)
}

fn loaded(api: &Arc<MockApi>, protected: bool, truncated_tree: bool) -> Branch {
    let (branch, tree) = full(protected, truncated_tree);
    api.respond_json(Method::Get, TREE_URL, tree);
    Branch::from_api_response(api.clone(), branch).unwrap()
}

mod construction_tests {
    use super::*;

    #[test]
    fn test_name_and_commit_come_from_summary() {
        let api = Arc::new(MockApi::new());

        let branch = Branch::from_list_response(
            api.clone(),
            json!({"name": "develop", "commit": {"sha": "bbb222"}}),
            "repos/acme/widgets/branches/develop",
        )
        .unwrap();

        assert_eq!(branch.name(), "develop");
        assert_eq!(branch.commit(), "bbb222");
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_summary_without_commit_sha_is_rejected() {
        let result = Branch::from_list_response(
            Arc::new(MockApi::new()),
            json!({"name": "develop", "commit": {}}),
            "repos/acme/widgets/branches/develop",
        );

        assert!(matches!(result, Err(ApiError::UnexpectedPayload { .. })));
    }
}

mod detail_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_branch_needs_no_request_for_head() {
        let api = Arc::new(MockApi::new());
        let branch = loaded(&api, false, false);

        let head = branch.head().await.unwrap();

        assert_eq!(head["message"], "Release 1.0");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_date_is_committer_date() {
        let api = Arc::new(MockApi::new());
        let branch = loaded(&api, false, false);

        let date = branch.date().await.unwrap();

        assert_eq!(date, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_unparseable_date_is_unexpected_payload() {
        let api = Arc::new(MockApi::new());
        let branch = Branch::from_api_response(
            api,
            json!({
                "name": "main",
                "commit": {"sha": "a", "commit": {"committer": {"date": "yesterday"}}},
            }),
        )
        .unwrap();

        let error = branch.date().await.unwrap_err();

        assert!(matches!(error, ApiError::UnexpectedPayload { .. }));
    }

    #[tokio::test]
    async fn test_listed_branch_fetches_detail_once_across_clones() {
        let api = Arc::new(MockApi::new());
        let (detail, _) = full(false, false);
        api.respond_json(Method::Get, "repos/acme/widgets/branches/main", detail);
        let branch = Branch::from_list_response(
            api.clone(),
            json!({"name": "main", "commit": {"sha": "aaa111"}, "protected": false}),
            "repos/acme/widgets/branches/main",
        )
        .unwrap();
        let clone = branch.clone();

        branch.head().await.unwrap();
        clone.date().await.unwrap();

        assert_eq!(
            api.call_count(Method::Get, "repos/acme/widgets/branches/main"),
            1
        );
    }

    #[tokio::test]
    async fn test_detail_without_url_is_logic_error() {
        let api = Arc::new(MockApi::new());
        let branch = Branch::from_list_response(
            api.clone(),
            json!({"name": "main", "commit": {"sha": "aaa111"}}),
            "",
        )
        .unwrap();

        let error = branch.head().await.unwrap_err();

        match error {
            ApiError::Logic { message } => assert!(message.contains("no URL has been provided")),
            other => panic!("expected Logic, got {:?}", other),
        }
        assert!(api.calls().is_empty());
    }
}

mod protection_tests {
    use super::*;

    #[tokio::test]
    async fn test_unprotected_branch_has_empty_protection() {
        let api = Arc::new(MockApi::new());
        let branch = loaded(&api, false, false);

        let protection = branch.protection().await.unwrap();

        assert_eq!(protection, json!({}));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_protected_branch_fetches_protection_under_self_link() {
        let api = Arc::new(MockApi::new());
        let url = format!("{}/protection", SELF_URL);
        api.respond_json(
            Method::Get,
            &url,
            json!({"required_status_checks": {"strict": true}}),
        );
        let branch = loaded(&api, true, false);

        let protection = branch.protection().await.unwrap();

        assert_eq!(protection["required_status_checks"]["strict"], true);
        assert_eq!(api.calls()[0].url, url);
    }

    #[tokio::test]
    async fn test_rooted_paths_bypass_self_link() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, "/rate_limit", json!({}));
        let branch = loaded(&api, false, false);

        branch.get("/rate_limit", Params::new()).await.unwrap();

        assert_eq!(api.calls()[0].url, "/rate_limit");
    }
}

mod tree_tests {
    use super::*;

    #[tokio::test]
    async fn test_navigation_fetches_head_tree_once() {
        let api = Arc::new(MockApi::new());
        let branch = loaded(&api, false, false);

        let directories = branch.directories().await.unwrap();
        let files = branch.files().await.unwrap();
        assert!(branch.has_directory("src").await.unwrap());
        assert!(!branch.has_file("Cargo.lock").await.unwrap());

        assert_eq!(directories[0].name(), "src");
        assert_eq!(files[0].name(), "Cargo.toml");
        assert_eq!(api.call_count(Method::Get, TREE_URL), 1);
    }

    #[tokio::test]
    async fn test_lookup_in_truncated_tree_is_truncated() {
        let api = Arc::new(MockApi::new());
        let branch = loaded(&api, false, true);

        let error = branch.directory("no-stuff").await.unwrap_err();

        assert!(matches!(error, ApiError::TruncatedResponse { .. }));
        assert_eq!(branch.file("Cargo.toml").await.unwrap().size(), 310);
    }

    #[tokio::test]
    async fn test_tree_fetch_failure_is_not_memoized() {
        let api = Arc::new(MockApi::new());
        let (detail, tree) = full(false, false);
        api.fail(Method::Get, TREE_URL, 502, "bad gateway");
        api.respond_json(Method::Get, TREE_URL, tree);
        let branch = Branch::from_api_response(api.clone(), detail).unwrap();

        assert_eq!(branch.files().await.unwrap_err().status(), Some(502));
        assert_eq!(branch.files().await.unwrap().len(), 1);
    }
}
