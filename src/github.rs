//! Transport to the GitHub GraphQL API.
//!
//! The rest of the crate only sees the `GraphQlTransport` trait, which lets tests replay
//! canned responses. `OctocrabTransport` is the production implementation.

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

const NOT_FOUND_TYPE: &str = "NOT_FOUND";
const NOT_FOUND_MESSAGE: &str = "Could not resolve to a";

#[derive(Debug, Error)]
pub enum GitHubError {
    /// The repository or user does not exist or is not visible to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("GitHub request failed: {0}")]
    Transport(#[from] octocrab::Error),

    #[error("unexpected response shape: {0}")]
    Decode(String),

    /// More pages than allowed were needed to cover the window.
    #[error("needed more than {0} pages to cover the window")]
    PageLimit(u32),

    #[error("timed out after {0} seconds")]
    Timeout(u64),
}

impl GitHubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound(_))
    }
}

impl From<serde_json::Error> for GitHubError {
    fn from(e: serde_json::Error) -> Self {
        GitHubError::Decode(e.to_string())
    }
}

/// Executes a GraphQL document and returns its `data` object.
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    async fn execute(&self, document: &str, variables: Value) -> Result<Value, GitHubError>;
}

/// Creates a transport for a single inbound request.
pub trait Connector: Send + Sync {
    fn connect(&self, authorization: Option<&str>)
        -> Result<Arc<dyn GraphQlTransport>, GitHubError>;
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    message: String,
}

impl GraphQlErrorEntry {
    fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some(NOT_FOUND_TYPE) || self.message.contains(NOT_FOUND_MESSAGE)
    }
}

/// Unwraps a GraphQL response body. GitHub reports most failures with a 200 status and
/// an `errors` array, so a non-empty array fails the whole request.
fn unwrap_envelope(envelope: GraphQlEnvelope) -> Result<Value, GitHubError> {
    if let Some(entry) = envelope.errors.iter().find(|e| e.is_not_found()) {
        return Err(GitHubError::NotFound(entry.message.clone()));
    }
    if !envelope.errors.is_empty() {
        let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(GitHubError::GraphQl(messages.join("; ")));
    }
    envelope
        .data
        .ok_or_else(|| GitHubError::Decode("response has neither data nor errors".to_string()))
}

pub struct OctocrabTransport {
    octocrab: Octocrab,
}

impl OctocrabTransport {
    pub fn new(octocrab: Octocrab) -> Self {
        Self { octocrab }
    }
}

#[async_trait]
impl GraphQlTransport for OctocrabTransport {
    async fn execute(&self, document: &str, variables: Value) -> Result<Value, GitHubError> {
        let payload = json!({ "query": document, "variables": variables });
        let envelope: GraphQlEnvelope = self.octocrab.graphql(&payload).await?;
        unwrap_envelope(envelope)
    }
}

/// Builds an Octocrab client per request, authenticated as the caller.
#[derive(Clone, Debug, Default)]
pub struct OctocrabConnector {
    api_url: Option<String>,
    fallback_token: Option<String>,
}

impl OctocrabConnector {
    pub fn new(api_url: Option<String>, fallback_token: Option<String>) -> Self {
        Self {
            api_url,
            fallback_token,
        }
    }
}

impl Connector for OctocrabConnector {
    fn connect(
        &self,
        authorization: Option<&str>,
    ) -> Result<Arc<dyn GraphQlTransport>, GitHubError> {
        let mut builder = Octocrab::builder();
        if let Some(url) = &self.api_url {
            builder = builder.base_uri(url.as_str())?;
        }
        let token = authorization
            .map(token_from_header)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| self.fallback_token.clone());
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        Ok(Arc::new(OctocrabTransport::new(builder.build()?)))
    }
}

/// Extracts the token from an `Authorization` header value. Accepts `Bearer <token>`,
/// `token <token>`, or a bare token.
pub fn token_from_header(header: &str) -> &str {
    let header = header.trim();
    match header.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token") =>
        {
            token.trim()
        }
        _ => header,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: Value) -> GraphQlEnvelope {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_unwrap_envelope_returns_data() {
        let data = unwrap_envelope(envelope(json!({ "data": { "viewer": { "login": "me" } } })))
            .unwrap();
        assert_eq!(data["viewer"]["login"], "me");
    }

    #[test]
    fn test_unwrap_envelope_not_found() {
        let err = unwrap_envelope(envelope(json!({
            "data": { "repository": null },
            "errors": [{
                "type": "NOT_FOUND",
                "path": ["repository"],
                "message": "Could not resolve to a Repository with the name 'o/missing'."
            }]
        })))
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unwrap_envelope_not_found_by_message() {
        let err = unwrap_envelope(envelope(json!({
            "errors": [{ "message": "Could not resolve to a User with the login of 'nobody'." }]
        })))
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unwrap_envelope_other_errors() {
        let err = unwrap_envelope(envelope(json!({
            "errors": [
                { "type": "RATE_LIMITED", "message": "API rate limit exceeded" },
                { "message": "Something else" }
            ]
        })))
        .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "GraphQL error: API rate limit exceeded; Something else"
        );
    }

    #[test]
    fn test_unwrap_envelope_empty_body() {
        let err = unwrap_envelope(envelope(json!({}))).unwrap_err();
        assert!(matches!(err, GitHubError::Decode(_)));
    }

    #[test]
    fn test_token_from_header() {
        assert_eq!(token_from_header("Bearer abc123"), "abc123");
        assert_eq!(token_from_header("token abc123"), "abc123");
        assert_eq!(token_from_header("BEARER  abc123 "), "abc123");
        assert_eq!(token_from_header("abc123"), "abc123");
    }
}
