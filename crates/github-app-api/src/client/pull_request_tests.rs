//! Tests for the pull request facade.

use super::*;
use crate::testing::{json_response, MockApi};

const PULL_URL: &str = "repos/acme/widgets/pulls/42";

fn repository(api: &Arc<MockApi>) -> Repository {
    Repository::from_api_response(
        api.clone(),
        json!({"name": "widgets", "full_name": "acme/widgets"}),
    )
    .unwrap()
}

fn detail() -> Value {
    json!({
        "number": 42,
        "title": "Add sprockets",
        "head": {"sha": "head42"},
        "mergeable_state": "clean",
        "labels": [
            {"id": 1, "name": "bug", "color": "d73a4a", "description": "Something isn't working"},
            {"id": 2, "name": "wip", "color": "ededed", "description": null},
        ],
    })
}

mod state_tests {
    use super::*;

    #[test]
    fn test_state_parses_case_insensitively() {
        assert_eq!("OPEN".parse::<PullRequestState>().unwrap(), PullRequestState::Open);
        assert_eq!("closed".parse::<PullRequestState>().unwrap(), PullRequestState::Closed);
        assert_eq!("All".parse::<PullRequestState>().unwrap(), PullRequestState::All);
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let result = "merged".parse::<PullRequestState>();

        assert!(matches!(result, Err(ApiError::Configuration { .. })));
    }

    #[test]
    fn test_empty_options_send_no_query() {
        assert!(PullRequestsOptions::new().to_params().is_empty());
    }

    #[test]
    fn test_options_become_query_parameters() {
        let params = PullRequestsOptions::new()
            .state(PullRequestState::Closed)
            .head("acme:feature")
            .per_page(50)
            .to_params();

        assert_eq!(params["state"], "closed");
        assert_eq!(params["head"], "acme:feature");
        assert_eq!(params["per_page"], 50);
        assert!(!params.contains_key("base"));
    }
}

mod url_tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_are_scoped_under_pull_request() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, "repos/acme/widgets/pulls/42/reviews", json!([]));

        let pull = PullRequest::new(repository(&api), 42);
        pull.get("reviews/", Params::new()).await.unwrap();

        assert_eq!(api.calls()[0].url, "repos/acme/widgets/pulls/42/reviews");
    }

    #[tokio::test]
    async fn test_absolute_urls_pass_through() {
        let api = Arc::new(MockApi::new());
        let url = "https://api.github.com/repos/acme/widgets/issues/42/labels";
        api.respond_json(Method::Get, url, json!([]));

        PullRequest::new(repository(&api), 42)
            .get(url, Params::new())
            .await
            .unwrap();

        assert_eq!(api.calls()[0].url, url);
    }
}

mod detail_tests {
    use super::*;

    #[tokio::test]
    async fn test_detail_is_fetched_once() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, PULL_URL, detail());
        let pull = PullRequest::new(repository(&api), 42);

        assert_eq!(pull.commit().await.unwrap(), "head42");
        assert_eq!(pull.mergeable_state().await.unwrap(), "clean");
        assert_eq!(pull.title(), Some("Add sprockets"));

        assert_eq!(api.call_count(Method::Get, PULL_URL), 1);
    }

    #[tokio::test]
    async fn test_listed_pull_request_uses_summary_for_commit() {
        let api = Arc::new(MockApi::new());
        let pull = PullRequest::from_list_response(
            repository(&api),
            json!({"number": 42, "head": {"sha": "listed"}}),
        )
        .unwrap();

        assert_eq!(pull.commit().await.unwrap(), "listed");
        assert!(api.calls().is_empty());
    }

    /// `mergeable_state` is only computed for single pull request lookups.
    #[tokio::test]
    async fn test_mergeable_state_always_loads_detail() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, PULL_URL, detail());
        let pull = PullRequest::from_list_response(
            repository(&api),
            json!({"number": 42, "head": {"sha": "head42"}}),
        )
        .unwrap();

        assert_eq!(pull.mergeable_state().await.unwrap(), "clean");
        assert_eq!(api.call_count(Method::Get, PULL_URL), 1);
    }

    #[tokio::test]
    async fn test_with_commit_overrides_head() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, PULL_URL, detail());
        let pull = PullRequest::new(repository(&api), 42);

        let pinned = pull.with_commit("older1");

        assert_eq!(pinned.commit().await.unwrap(), "older1");
        assert_eq!(pull.commit().await.unwrap(), "head42");
        assert_eq!(pinned.number(), 42);
    }

    #[test]
    fn test_listing_entry_without_number_is_rejected() {
        let api = Arc::new(MockApi::new());

        let result = PullRequest::from_list_response(repository(&api), json!({"title": "x"}));

        assert!(matches!(result, Err(ApiError::UnexpectedPayload { .. })));
    }
}

mod label_tests {
    use super::*;

    #[tokio::test]
    async fn test_labels_from_detail() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, PULL_URL, detail());

        let labels = PullRequest::new(repository(&api), 42).labels().await.unwrap();

        let names: Vec<&str> = labels.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["bug", "wip"]);
        assert_eq!(labels[1].description(), "");
    }

    #[tokio::test]
    async fn test_labels_from_listing_need_no_request() {
        let api = Arc::new(MockApi::new());
        let pull = PullRequest::from_list_response(
            repository(&api),
            json!({"number": 3, "labels": [{"id": 9, "name": "docs", "color": "0075ca"}]}),
        )
        .unwrap();

        let labels = pull.labels().await.unwrap();

        assert_eq!(labels[0].id(), 9);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_labels_read_as_empty() {
        let api = Arc::new(MockApi::new());
        let pull = PullRequest::from_list_response(repository(&api), json!({"number": 3})).unwrap();

        assert!(pull.labels().await.unwrap().is_empty());
    }
}

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_files_follow_pagination() {
        let api = Arc::new(MockApi::new());
        let next = "https://api.github.com/repositories/1/pulls/42/files?page=2";
        api.respond(
            Method::Get,
            "repos/acme/widgets/pulls/42/files",
            json_response(json!([{"filename": "src/lib.rs"}]))
                .with_header("Link", format!("<{}>; rel=\"next\"", next)),
        );
        api.respond_json(Method::Get, next, json!([{"filename": "README.md"}]));

        let pull = PullRequest::new(repository(&api), 42);
        let files = pull.files().try_collect().await.unwrap();

        let names: Vec<&str> = files.iter().filter_map(|f| f["filename"].as_str()).collect();
        assert_eq!(names, vec!["src/lib.rs", "README.md"]);
    }

    #[tokio::test]
    async fn test_comments_listing() {
        let api = Arc::new(MockApi::new());
        api.respond_json(
            Method::Get,
            "repos/acme/widgets/pulls/42/comments",
            json!([{"id": 10, "body": "nit"}]),
        );

        let pull = PullRequest::new(repository(&api), 42);
        let comments = pull.comments().try_collect().await.unwrap();

        assert_eq!(comments[0]["body"], "nit");
    }
}

mod comment_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_comment_posts_to_head_commit() {
        let api = Arc::new(MockApi::new());
        api.respond_json(Method::Get, PULL_URL, detail());
        api.respond_json(
            Method::Post,
            "repos/acme/widgets/pulls/42/comments",
            json!({"id": 77}),
        );

        let created = PullRequest::new(repository(&api), 42)
            .add_comment("Looks off by one", "src/lib.rs", 4)
            .await
            .unwrap();

        assert_eq!(created["id"], 77);
        let post = api.calls().pop().unwrap();
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.data["body"], "Looks off by one");
        assert_eq!(post.data["commit_id"], "head42");
        assert_eq!(post.data["path"], "src/lib.rs");
        assert_eq!(post.data["position"], 4);
    }

    #[tokio::test]
    async fn test_add_comment_on_pinned_commit_skips_detail() {
        let api = Arc::new(MockApi::new());
        api.respond_json(
            Method::Post,
            "repos/acme/widgets/pulls/42/comments",
            json!({"id": 78}),
        );

        PullRequest::new(repository(&api), 42)
            .with_commit("older1")
            .add_comment("Still here", "README.md", 1)
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].data["commit_id"], "older1");
    }
}
