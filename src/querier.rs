//! Service layer for computing health scores.
//!
//! `MetricsQuerier` is created for a single request. It fetches the raw issues and pull
//! requests for a window through the paginator and hands them to the aggregators in
//! `metrics`. Fetches run one after another; nothing is shared between requests.

use crate::config::{AppConfig, RepoId};
use crate::github::{GitHubError, GraphQlTransport};
use crate::metrics::{
    self, RepositoryScore, UserScore, WeeklyCiMetrics, WeeklyIssueMetrics,
    WeeklyPullRequestMetrics,
};
use crate::paginator::{ConnectionQuery, Paginator};
use crate::queries::{self, FieldSet};
use crate::types::{Issue, PullRequest};
use crate::window::Window;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct MetricsQuerier {
    transport: Arc<dyn GraphQlTransport>,
    page_size: u32,
    max_pages: u32,
}

impl MetricsQuerier {
    pub fn new(transport: Arc<dyn GraphQlTransport>, config: &AppConfig) -> Self {
        Self {
            transport,
            page_size: config.page_size,
            max_pages: config.max_github_api_pages,
        }
    }

    fn paginator(&self) -> Paginator<'_> {
        Paginator::new(self.transport.as_ref(), self.page_size, self.max_pages)
    }

    /// Name of the repository's default branch. `None` for empty repositories.
    pub async fn default_branch(&self, repo_id: &RepoId) -> Result<Option<String>, GitHubError> {
        let data = self
            .transport
            .execute(
                queries::DEFAULT_BRANCH_QUERY,
                json!({ "owner": repo_id.owner, "name": repo_id.repo }),
            )
            .await?;

        let repository = data
            .get("repository")
            .filter(|r| !r.is_null())
            .ok_or_else(|| GitHubError::NotFound(format!("repository {repo_id}")))?;

        Ok(repository
            .pointer("/defaultBranchRef/name")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub async fn repo_issues(
        &self,
        repo_id: &RepoId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>, GitHubError> {
        let query = ConnectionQuery {
            document: queries::REPO_ISSUES_QUERY.to_string(),
            variables: repo_variables(repo_id),
            owner: "repository",
            connection: "issues",
        };
        let issues = self.paginator().created_since(&query, since).await?;
        tracing::info!(repo_id = %repo_id, count = issues.len(), "Fetched issues");
        Ok(issues)
    }

    /// Pull requests targeting the repository's default branch.
    pub async fn repo_pull_requests(
        &self,
        repo_id: &RepoId,
        since: DateTime<Utc>,
        fields: FieldSet,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let default_branch = self.default_branch(repo_id).await?;

        let mut variables = repo_variables(repo_id);
        variables.insert("baseRefName".to_string(), Value::from(default_branch));
        let query = ConnectionQuery {
            document: queries::repo_pull_requests_query(fields),
            variables,
            owner: "repository",
            connection: "pullRequests",
        };
        let prs = self.paginator().created_since(&query, since).await?;
        tracing::info!(repo_id = %repo_id, count = prs.len(), "Fetched pull requests");
        Ok(prs)
    }

    pub async fn user_pull_requests(
        &self,
        user: &str,
        since: DateTime<Utc>,
        fields: FieldSet,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let mut variables = Map::new();
        variables.insert("user".to_string(), Value::from(user));
        let query = ConnectionQuery {
            document: queries::user_pull_requests_query(fields),
            variables,
            owner: "user",
            connection: "pullRequests",
        };
        let prs = self.paginator().created_since(&query, since).await?;
        tracing::info!(user, count = prs.len(), "Fetched pull requests");
        Ok(prs)
    }

    pub async fn issue_score(
        &self,
        repo_id: &RepoId,
        window: &Window,
    ) -> Result<Vec<WeeklyIssueMetrics>, GitHubError> {
        let issues = self.repo_issues(repo_id, window.since).await?;
        Ok(metrics::issue_score(&issues, window))
    }

    pub async fn pr_score(
        &self,
        repo_id: &RepoId,
        window: &Window,
    ) -> Result<Vec<WeeklyPullRequestMetrics>, GitHubError> {
        let prs = self
            .repo_pull_requests(repo_id, window.since, FieldSet::REVIEWS)
            .await?;
        Ok(metrics::pull_request_score(&prs, window))
    }

    pub async fn ci_score(
        &self,
        repo_id: &RepoId,
        window: &Window,
    ) -> Result<Vec<WeeklyCiMetrics>, GitHubError> {
        let prs = self
            .repo_pull_requests(repo_id, window.since, FieldSet::FULL)
            .await?;
        Ok(metrics::ci_score(&prs, window))
    }

    /// Issues, pull requests and CI for one repository. Pull requests are fetched once and
    /// feed both the PR and CI scores.
    pub async fn repository_score(
        &self,
        repo_id: &RepoId,
        window: &Window,
    ) -> Result<RepositoryScore, GitHubError> {
        let issues = self.repo_issues(repo_id, window.since).await?;
        let prs = self
            .repo_pull_requests(repo_id, window.since, FieldSet::FULL)
            .await?;

        Ok(RepositoryScore {
            issues: metrics::issue_score(&issues, window),
            prs: metrics::pull_request_score(&prs, window),
            ci: metrics::ci_score(&prs, window),
        })
    }

    pub async fn user_pr_score(
        &self,
        user: &str,
        window: &Window,
    ) -> Result<Vec<WeeklyPullRequestMetrics>, GitHubError> {
        let prs = self
            .user_pull_requests(user, window.since, FieldSet::REVIEWS)
            .await?;
        Ok(metrics::pull_request_score(&prs, window))
    }

    pub async fn user_score(&self, user: &str, window: &Window) -> Result<UserScore, GitHubError> {
        Ok(UserScore {
            prs: self.user_pr_score(user, window).await?,
        })
    }
}

fn repo_variables(repo_id: &RepoId) -> Map<String, Value> {
    let mut variables = Map::new();
    variables.insert("owner".to_string(), Value::from(repo_id.owner.as_str()));
    variables.insert("name".to_string(), Value::from(repo_id.repo.as_str()));
    variables
}
