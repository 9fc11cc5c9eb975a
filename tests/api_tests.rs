use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use repohealth::{
    config::AppConfig,
    create_app,
    github::GitHubError,
    test_support::{issue_node, issues_page, CannedConnector},
    AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

fn test_config() -> AppConfig {
    AppConfig {
        default_weeks: 4,
        ..AppConfig::default()
    }
}

fn app_with(responses: Vec<Result<Value, GitHubError>>) -> (Router, Arc<CannedConnector>) {
    app_with_config(test_config(), responses)
}

fn app_with_config(
    config: AppConfig,
    responses: Vec<Result<Value, GitHubError>>,
) -> (Router, Arc<CannedConnector>) {
    let connector = Arc::new(CannedConnector::new(responses));
    let state = Arc::new(AppState::with_connector(config, connector.clone()));
    (create_app(state), connector)
}

fn empty_issues() -> Value {
    issues_page(vec![], None, false)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("Authorization", "Bearer caller-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app_with(vec![]);

    let (status, body) = get(app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    let body_json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body_json["status"], "ok");
    assert_eq!(body_json["service"], "repohealth");
}

#[tokio::test]
async fn test_issue_score_returns_requested_weeks() {
    let (app, connector) = app_with(vec![Ok(empty_issues())]);

    let (status, body) = get(app, "/api/repos/o/r/issues?weeks=3").await;

    assert_eq!(status, StatusCode::OK);
    let weeks: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(weeks.len(), 3);
    assert!(weeks.iter().all(|w| w["opened"] == 0 && w["closed"] == 0));

    assert_eq!(
        connector.authorizations(),
        vec![Some("Bearer caller-token".to_string())]
    );
}

#[tokio::test]
async fn test_unparseable_weeks_uses_default() {
    let (app, _) = app_with(vec![Ok(empty_issues())]);

    let (status, body) = get(app, "/api/repos/o/r/issues?weeks=lots").await;

    assert_eq!(status, StatusCode::OK);
    let weeks: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(weeks.len(), 4);
}

#[tokio::test]
async fn test_oversized_weeks_uses_default() {
    let (app, connector) = app_with(vec![Ok(empty_issues())]);

    let (status, body) = get(app, "/api/repos/o/r/issues?weeks=20000000").await;

    assert_eq!(status, StatusCode::OK);
    let weeks: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(weeks.len(), 4);
    assert_eq!(connector.transport().calls().len(), 1);
}

#[tokio::test]
async fn test_missing_repository_is_404() {
    let (app, _) = app_with(vec![Err(GitHubError::NotFound(
        "Could not resolve to a Repository with the name 'o/missing'.".to_string(),
    ))]);

    let (status, _) = get(app, "/api/repos/o/missing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let (app, _) = app_with(vec![
        Ok(json!({ "repository": { "defaultBranchRef": { "name": "main" } } })),
        Err(GitHubError::GraphQl("Something went wrong".to_string())),
    ]);

    let (status, _) = get(app, "/api/repos/o/r/prs").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_page_limit_is_500() {
    // A full page of recent issues that still has more behind it.
    let recent = chrono::Utc::now().to_rfc3339();
    let config = AppConfig {
        max_github_api_pages: 1,
        ..test_config()
    };
    let (app, connector) = app_with_config(
        config,
        vec![Ok(issues_page(
            vec![issue_node(1, &recent, None)],
            Some("c1"),
            true,
        ))],
    );

    let (status, _) = get(app, "/api/repos/o/r/issues").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(connector.transport().calls().len(), 1);
}

#[tokio::test]
async fn test_user_score_contract() {
    let (app, _) = app_with(vec![Ok(json!({
        "user": {
            "pullRequests": {
                "nodes": [],
                "pageInfo": { "endCursor": null, "hasNextPage": false }
            }
        }
    }))]);

    let (status, body) = get(app, "/api/users/alice?weeks=2").await;

    assert_eq!(status, StatusCode::OK);
    let score: Value = serde_json::from_slice(&body).unwrap();
    let prs = score["prs"].as_array().unwrap();
    assert_eq!(prs.len(), 2);
    for field in ["week", "opened", "merged", "rejected", "num_reviews", "pull_requests"] {
        assert!(prs[0].get(field).is_some(), "missing {field}");
    }
}

#[test]
fn test_repository_score_contract() {
    // Guards the JSON field names the frontend reads.
    use repohealth::metrics::{
        CheckDetail, IssueDetail, RepositoryScore, WeeklyCiMetrics, WeeklyIssueMetrics,
    };
    use repohealth::types::ItemState;

    let response = RepositoryScore {
        issues: vec![WeeklyIssueMetrics {
            week: "2023-01-01".to_string(),
            opened: 1,
            closed: 1,
            issues: vec![IssueDetail {
                number: 1,
                title: "Crash on start".to_string(),
                url: "https://github.com/o/r/issues/1".to_string(),
                state: ItemState::Closed,
                resolution_time: 345600,
            }],
        }],
        prs: vec![],
        ci: vec![WeeklyCiMetrics {
            week: "2023-01-01".to_string(),
            checks: vec![CheckDetail {
                pull_request: 2,
                pull_request_url: "https://github.com/o/r/pull/2".to_string(),
                name: "ci/test".to_string(),
                duration: 600,
                target_url: None,
            }],
        }],
    };

    let json = serde_json::to_value(&response).unwrap();

    let week = &json["issues"][0];
    assert_eq!(week["week"], "2023-01-01");
    assert_eq!(week["opened"], 1);
    assert_eq!(week["closed"], 1);
    assert_eq!(week["issues"][0]["state"], "CLOSED");
    assert_eq!(week["issues"][0]["resolution_time"], 345600);
    assert_eq!(json["prs"], json!([]));
    assert_eq!(json["ci"][0]["checks"][0]["name"], "ci/test");
    assert_eq!(json["ci"][0]["checks"][0]["duration"], 600);
    assert_eq!(json["ci"][0]["checks"][0]["target_url"], Value::Null);
}
