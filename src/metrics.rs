use crate::types::{Commit, Issue, ItemState, PullRequest, StatusContext};
use crate::window::Window;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Recorded as the resolution or review time of items that have none within the window.
pub const UNRESOLVED: i64 = -1;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct IssueDetail {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: ItemState,
    /// Seconds from creation to closure, or `UNRESOLVED`.
    pub resolution_time: i64,
}

/// Issue counts for one week of the window.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct WeeklyIssueMetrics {
    /// Start of the week, formatted with the window's label format.
    pub week: String,
    pub opened: usize,
    pub closed: usize,
    /// Issues opened this week.
    pub issues: Vec<IssueDetail>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PullRequestDetail {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: ItemState,
    pub num_reviews: u64,
    /// Seconds from creation to merge or closure, or `UNRESOLVED`.
    pub resolution_time: i64,
    /// Seconds from creation to the first review by someone other than the author,
    /// or `UNRESOLVED`.
    pub review_time: i64,
}

/// Pull request counts for one week of the window.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct WeeklyPullRequestMetrics {
    pub week: String,
    pub opened: usize,
    pub merged: usize,
    pub rejected: usize,
    /// Total reviews on pull requests opened this week.
    pub num_reviews: u64,
    pub pull_requests: Vec<PullRequestDetail>,
}

/// The slowest status check on a pull request's latest commit.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CheckDetail {
    pub pull_request: u64,
    pub pull_request_url: String,
    pub name: String,
    /// Seconds from the status start date to the check's creation.
    pub duration: i64,
    pub target_url: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct WeeklyCiMetrics {
    pub week: String,
    pub checks: Vec<CheckDetail>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RepositoryScore {
    pub issues: Vec<WeeklyIssueMetrics>,
    pub prs: Vec<WeeklyPullRequestMetrics>,
    pub ci: Vec<WeeklyCiMetrics>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UserScore {
    pub prs: Vec<WeeklyPullRequestMetrics>,
}

/// Seconds from `created_at` to `closed_at`, when the closure falls inside the window.
fn resolution_time(
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    window: &Window,
) -> Option<i64> {
    closed_at
        .filter(|closed| *closed >= window.since)
        .map(|closed| (closed - created_at).num_seconds())
}

/// Buckets issues into weeks by creation and closure date.
///
/// Issues created before the window are ignored. Issues closed before the window count as
/// still open.
pub fn issue_score(issues: &[Issue], window: &Window) -> Vec<WeeklyIssueMetrics> {
    let mut weeks: Vec<WeeklyIssueMetrics> = window
        .labels()
        .into_iter()
        .map(|week| WeeklyIssueMetrics {
            week,
            opened: 0,
            closed: 0,
            issues: Vec::new(),
        })
        .collect();

    for issue in issues {
        let Some(created_week) = window.bucket_of(issue.created_at) else {
            continue;
        };
        weeks[created_week].opened += 1;

        let resolution = resolution_time(issue.created_at, issue.closed_at, window);
        if let Some(closed_week) = issue.closed_at.and_then(|c| window.bucket_of(c)) {
            weeks[closed_week].closed += 1;
        }

        weeks[created_week].issues.push(IssueDetail {
            number: issue.number,
            title: issue.title.clone(),
            url: issue.url.clone(),
            state: issue.state,
            resolution_time: resolution.unwrap_or(UNRESOLVED),
        });
    }

    weeks
}

/// Seconds until the first review left by someone other than the author.
pub fn review_time(pr: &PullRequest) -> Option<i64> {
    let author = pr.author_login();
    pr.reviews
        .nodes
        .iter()
        .filter(|review| review.author.as_ref().map(|a| a.login.as_str()) != author)
        .map(|review| review.created_at)
        .min()
        .map(|first| (first - pr.created_at).num_seconds())
}

/// Buckets pull requests into weeks. Closed pull requests are counted as merged or
/// rejected in the week they were closed.
pub fn pull_request_score(prs: &[PullRequest], window: &Window) -> Vec<WeeklyPullRequestMetrics> {
    let mut weeks: Vec<WeeklyPullRequestMetrics> = window
        .labels()
        .into_iter()
        .map(|week| WeeklyPullRequestMetrics {
            week,
            opened: 0,
            merged: 0,
            rejected: 0,
            num_reviews: 0,
            pull_requests: Vec::new(),
        })
        .collect();

    for pr in prs {
        let Some(created_week) = window.bucket_of(pr.created_at) else {
            continue;
        };
        weeks[created_week].opened += 1;
        weeks[created_week].num_reviews += pr.reviews.total_count;

        let resolution = resolution_time(pr.created_at, pr.closed_at, window);
        if let Some(closed_week) = pr.closed_at.and_then(|c| window.bucket_of(c)) {
            if pr.merged {
                weeks[closed_week].merged += 1;
            } else {
                weeks[closed_week].rejected += 1;
            }
        }

        weeks[created_week].pull_requests.push(PullRequestDetail {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.url.clone(),
            state: pr.state,
            num_reviews: pr.reviews.total_count,
            resolution_time: resolution.unwrap_or(UNRESOLVED),
            review_time: review_time(pr).unwrap_or(UNRESOLVED),
        });
    }

    weeks
}

/// The point CI durations are measured from.
///
/// Commits pushed to a fork carry no push date, so cross-repository pull requests use the
/// earlier of the PR creation and the commit date.
pub fn status_start_date(pr: &PullRequest, commit: &Commit) -> DateTime<Utc> {
    if pr.is_cross_repository {
        if pr.created_at < commit.committed_date {
            pr.created_at
        } else {
            commit.committed_date
        }
    } else {
        commit.pushed_date.unwrap_or(commit.committed_date)
    }
}

/// The context created last relative to `start`. Ties keep the first context.
fn slowest_check(contexts: &[StatusContext], start: DateTime<Utc>) -> Option<(&StatusContext, i64)> {
    contexts
        .iter()
        .map(|context| (context, (context.created_at - start).num_seconds()))
        .fold(None, |slowest, candidate| match slowest {
            Some((_, longest)) if longest >= candidate.1 => slowest,
            _ => Some(candidate),
        })
}

/// Buckets the slowest check of each pull request's latest commit.
///
/// The week comes from the status start date; a start date before the window (e.g. a commit
/// pushed before the PR was opened) falls back to the PR's creation week.
pub fn ci_score(prs: &[PullRequest], window: &Window) -> Vec<WeeklyCiMetrics> {
    let mut weeks: Vec<WeeklyCiMetrics> = window
        .labels()
        .into_iter()
        .map(|week| WeeklyCiMetrics {
            week,
            checks: Vec::new(),
        })
        .collect();

    for pr in prs {
        let Some(commit) = pr.latest_commit() else {
            continue;
        };
        let Some(status) = &commit.status else {
            continue;
        };

        let start = status_start_date(pr, commit);
        let Some((context, duration)) = slowest_check(&status.contexts, start) else {
            continue;
        };

        let mut week = window.week_of(start);
        if week < 0 {
            week = window.week_of(pr.created_at);
        }
        let Some(week) = window.bucket_index(week) else {
            continue;
        };

        weeks[week].checks.push(CheckDetail {
            pull_request: pr.number,
            pull_request_url: pr.url.clone(),
            name: context.context.clone(),
            duration,
            target_url: context.target_url.clone(),
        });
    }

    weeks
}
