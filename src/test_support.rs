//! Canned GraphQL transports and response builders shared by unit and router tests.

use crate::github::{Connector, GitHubError, GraphQlTransport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned `data` objects in order and records the variables of each call.
#[derive(Default)]
pub struct CannedTransport {
    responses: Mutex<VecDeque<Result<Value, GitHubError>>>,
    calls: Mutex<Vec<Value>>,
}

impl CannedTransport {
    pub fn new(responses: Vec<Result<Value, GitHubError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphQlTransport for CannedTransport {
    async fn execute(&self, _document: &str, variables: Value) -> Result<Value, GitHubError> {
        self.calls.lock().unwrap().push(variables);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GitHubError::GraphQl("no canned response left".into())))
    }
}

/// Hands out one shared `CannedTransport` and records the `Authorization` header of
/// each request.
pub struct CannedConnector {
    transport: Arc<CannedTransport>,
    authorizations: Mutex<Vec<Option<String>>>,
}

impl CannedConnector {
    pub fn new(responses: Vec<Result<Value, GitHubError>>) -> Self {
        Self {
            transport: Arc::new(CannedTransport::new(responses)),
            authorizations: Mutex::new(Vec::new()),
        }
    }

    pub fn transport(&self) -> &CannedTransport {
        &self.transport
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.authorizations.lock().unwrap().clone()
    }
}

impl Connector for CannedConnector {
    fn connect(
        &self,
        authorization: Option<&str>,
    ) -> Result<Arc<dyn GraphQlTransport>, GitHubError> {
        self.authorizations
            .lock()
            .unwrap()
            .push(authorization.map(str::to_string));
        Ok(self.transport.clone())
    }
}

pub fn issue_node(number: u64, created_at: &str, closed_at: Option<&str>) -> Value {
    json!({
        "number": number,
        "title": format!("Issue {number}"),
        "url": format!("https://github.com/o/r/issues/{number}"),
        "state": if closed_at.is_some() { "CLOSED" } else { "OPEN" },
        "createdAt": created_at,
        "closedAt": closed_at,
    })
}

pub fn issues_page(nodes: Vec<Value>, end_cursor: Option<&str>, has_next_page: bool) -> Value {
    json!({
        "repository": {
            "issues": {
                "nodes": nodes,
                "pageInfo": { "endCursor": end_cursor, "hasNextPage": has_next_page }
            }
        }
    })
}
