pub mod config;
pub mod github;
pub mod metrics;
pub mod paginator;
pub mod querier;
pub mod queries;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod types;
pub mod window;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use config::{AppConfig, RepoId};
use github::{Connector, GitHubError, OctocrabConnector};
use querier::MetricsQuerier;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use window::Window;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Shared application state accessible to all request handlers.
pub struct AppState {
    /// Application configuration loaded from environment variables.
    pub config: AppConfig,
    /// Builds a GitHub transport for each request from the caller's credentials.
    pub connector: Arc<dyn Connector>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let connector = OctocrabConnector::new(
            config.github_api_url.clone(),
            config.github_token.clone(),
        );
        Self::with_connector(config, Arc::new(connector))
    }

    pub fn with_connector(config: AppConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeeksParams {
    weeks: Option<String>,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/repos/{owner}/{repo}", get(get_repository_score))
        .route("/api/repos/{owner}/{repo}/issues", get(get_repository_issues))
        .route("/api/repos/{owner}/{repo}/prs", get(get_repository_prs))
        .route("/api/repos/{owner}/{repo}/ci", get(get_repository_ci))
        .route("/api/users/{user}", get(get_user_score))
        .route("/api/users/{user}/prs", get(get_user_prs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "repohealth",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the querier and window shared by every score handler.
fn prepare(
    state: &AppState,
    headers: &HeaderMap,
    params: &WeeksParams,
) -> Result<(MetricsQuerier, Window), (StatusCode, String)> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let transport = state
        .connector
        .connect(authorization)
        .map_err(|e| error_response("connect", e))?;

    let weeks = window::parse_weeks(
        params.weeks.as_deref(),
        state.config.default_weeks,
        state.config.max_weeks,
    );
    let window = Window::ending_at(Utc::now(), weeks)
        .with_label_format(state.config.week_label_format.clone());

    Ok((MetricsQuerier::new(transport, &state.config), window))
}

/// Runs one score computation under the configured request timeout.
async fn run<T>(
    state: &AppState,
    subject: &str,
    fut: impl Future<Output = Result<T, GitHubError>>,
) -> ApiResult<T> {
    let timeout = state.config.request_timeout();
    let result = match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GitHubError::Timeout(timeout.as_secs())),
    };
    match result {
        Ok(score) => {
            tracing::debug!(subject, "Returning score");
            Ok(Json(score))
        }
        Err(e) => Err(error_response(subject, e)),
    }
}

fn error_response(subject: &str, e: GitHubError) -> (StatusCode, String) {
    tracing::error!("Failed to score {}: {}", subject, e);
    if e.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    }
}

pub async fn get_repository_score(
    Path(repo_id): Path<RepoId>,
    Query(params): Query<WeeksParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<metrics::RepositoryScore> {
    let (querier, window) = prepare(&state, &headers, &params)?;
    let subject = repo_id.to_string();
    run(&state, &subject, querier.repository_score(&repo_id, &window)).await
}

pub async fn get_repository_issues(
    Path(repo_id): Path<RepoId>,
    Query(params): Query<WeeksParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<metrics::WeeklyIssueMetrics>> {
    let (querier, window) = prepare(&state, &headers, &params)?;
    let subject = repo_id.to_string();
    run(&state, &subject, querier.issue_score(&repo_id, &window)).await
}

pub async fn get_repository_prs(
    Path(repo_id): Path<RepoId>,
    Query(params): Query<WeeksParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<metrics::WeeklyPullRequestMetrics>> {
    let (querier, window) = prepare(&state, &headers, &params)?;
    let subject = repo_id.to_string();
    run(&state, &subject, querier.pr_score(&repo_id, &window)).await
}

pub async fn get_repository_ci(
    Path(repo_id): Path<RepoId>,
    Query(params): Query<WeeksParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<metrics::WeeklyCiMetrics>> {
    let (querier, window) = prepare(&state, &headers, &params)?;
    let subject = repo_id.to_string();
    run(&state, &subject, querier.ci_score(&repo_id, &window)).await
}

pub async fn get_user_score(
    Path(user): Path<String>,
    Query(params): Query<WeeksParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<metrics::UserScore> {
    let (querier, window) = prepare(&state, &headers, &params)?;
    run(&state, &user, querier.user_score(&user, &window)).await
}

pub async fn get_user_prs(
    Path(user): Path<String>,
    Query(params): Query<WeeksParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<metrics::WeeklyPullRequestMetrics>> {
    let (querier, window) = prepare(&state, &headers, &params)?;
    run(&state, &user, querier.user_pr_score(&user, &window)).await
}
