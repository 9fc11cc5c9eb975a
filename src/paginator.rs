//! Cursor pagination over GraphQL connections ordered by creation time, newest first.

use crate::github::{GitHubError, GraphQlTransport};
use crate::types::Node;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
    page_info: PageInfo,
}

/// A query returning one connection, e.g. `repository.issues`.
#[derive(Debug, Clone)]
pub struct ConnectionQuery {
    pub document: String,
    /// Variables other than `pageSize` and `after`, which the paginator supplies.
    pub variables: Map<String, Value>,
    /// Top-level field owning the connection (`repository` or `user`).
    pub owner: &'static str,
    /// Connection field on the owner (`issues` or `pullRequests`).
    pub connection: &'static str,
}

impl ConnectionQuery {
    fn page<T: DeserializeOwned>(&self, mut data: Value) -> Result<Connection<T>, GitHubError> {
        let owner = match data.get_mut(self.owner) {
            Some(owner) if !owner.is_null() => owner,
            _ => return Err(GitHubError::NotFound(format!("{} is null", self.owner))),
        };
        let connection = owner.get_mut(self.connection).map(Value::take).ok_or_else(|| {
            GitHubError::Decode(format!("missing {}.{}", self.owner, self.connection))
        })?;
        Ok(serde_json::from_value(connection)?)
    }
}

pub struct Paginator<'a> {
    transport: &'a dyn GraphQlTransport,
    page_size: u32,
    max_pages: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(transport: &'a dyn GraphQlTransport, page_size: u32, max_pages: u32) -> Self {
        Self {
            transport,
            page_size,
            max_pages,
        }
    }

    /// Fetches every node created at or after `since`.
    ///
    /// Pages arrive newest first, so the first page containing an older node is the last
    /// one needed. Any upstream error aborts the whole fetch, as does needing more than
    /// `max_pages` pages to reach `since`.
    pub async fn created_since<T>(
        &self,
        query: &ConnectionQuery,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>, GitHubError>
    where
        T: DeserializeOwned + Node + Send,
    {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut variables = query.variables.clone();
            variables.insert("pageSize".to_string(), Value::from(self.page_size));
            variables.insert("after".to_string(), Value::from(cursor.take()));

            let data = self
                .transport
                .execute(&query.document, Value::Object(variables))
                .await?;
            let page: Connection<T> = query.page(data)?;
            pages += 1;

            let received = page.nodes.len();
            let retained = retained_prefix(&page.nodes, since);
            items.extend(
                page.nodes
                    .into_iter()
                    .take(retained)
                    .filter(|node| node.created_at() >= since)
                    .filter(|node| seen.insert(node.number())),
            );

            tracing::debug!(
                connection = query.connection,
                page = pages,
                received,
                retained,
                "Fetched page"
            );

            if retained < received || !page.page_info.has_next_page || received == 0 {
                break;
            }
            match page.page_info.end_cursor {
                Some(end_cursor) => cursor = Some(end_cursor),
                None => break,
            }
            if pages >= self.max_pages {
                tracing::warn!(
                    connection = query.connection,
                    "Hit max_github_api_pages ({}) before reaching {}",
                    self.max_pages,
                    since
                );
                return Err(GitHubError::PageLimit(self.max_pages));
            }
        }

        Ok(items)
    }
}

/// Length of the page prefix that ends with the last node created at or after `since`.
fn retained_prefix<T: Node>(nodes: &[T], since: DateTime<Utc>) -> usize {
    nodes
        .iter()
        .rposition(|node| node.created_at() >= since)
        .map_or(0, |i| i + 1)
}
