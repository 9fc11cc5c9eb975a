//! Snapshots of GitHub objects as returned by the GraphQL API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that can be accumulated by the paginator.
pub trait Node {
    fn number(&self) -> u64;
    fn created_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    Open,
    Closed,
    Merged,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: ItemState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Node for Issue {
    fn number(&self) -> u64 {
        self.number
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub created_at: DateTime<Utc>,
    /// `None` for reviews left by deleted accounts.
    #[serde(default)]
    pub author: Option<Actor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConnection {
    pub total_count: u64,
    /// Only populated when review details are requested.
    #[serde(default)]
    pub nodes: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusContext {
    /// Name of the check, e.g. "ci/circleci: build".
    pub context: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub target_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub contexts: Vec<StatusContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub committed_date: DateTime<Utc>,
    /// GitHub does not know when commits from forks were pushed.
    #[serde(default)]
    pub pushed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitNode {
    pub commit: Commit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitConnection {
    #[serde(default)]
    pub nodes: Vec<CommitNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: ItemState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged: bool,
    pub is_cross_repository: bool,
    #[serde(default)]
    pub author: Option<Actor>,
    #[serde(default)]
    pub reviews: ReviewConnection,
    /// The most recent commit only; absent unless CI fields are requested.
    #[serde(default)]
    pub commits: Option<CommitConnection>,
}

impl PullRequest {
    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.login.as_str())
    }

    pub fn latest_commit(&self) -> Option<&Commit> {
        self.commits
            .as_ref()
            .and_then(|c| c.nodes.last())
            .map(|node| &node.commit)
    }
}

impl Node for PullRequest {
    fn number(&self) -> u64 {
        self.number
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
