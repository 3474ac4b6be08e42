//! Registry client seam and the HTTP plumbing shared by implementations

use crate::schema::{CandidateReference, FailureKind, RegistryResult, SourceId};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 200;

/// Why a registry lookup produced no answer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request rejected with {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl SearchError {
    /// Timeouts, connection failures and 5xx are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SearchError::Transport(_) | SearchError::Timeout(_) | SearchError::Server { .. }
        )
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            SearchError::Transport(_) => FailureKind::Transport,
            SearchError::Timeout(_) => FailureKind::Timeout,
            SearchError::Server { .. } => FailureKind::Server,
            SearchError::Auth(_) => FailureKind::Auth,
            SearchError::Rejected { .. } => FailureKind::Rejected,
            SearchError::Parse(_) => FailureKind::Parse,
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = truncate(body.trim(), MAX_ERROR_BODY);
        match status.as_u16() {
            401 | 403 => SearchError::Auth(format!("HTTP {}", status.as_u16())),
            code @ 500..=599 => SearchError::Server { status: code, body },
            code => SearchError::Rejected { status: code, body },
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SearchError::Parse(e.to_string())
        } else {
            SearchError::Transport(e.to_string())
        }
    }
}

/// One external registry able to confirm a citation.
///
/// `Ok(None)` is a successful negative: the registry answered and nothing
/// matched. Errors are typed so callers can tell "no answer" apart from it;
/// implementations must not panic on bad input from the network.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    fn source(&self) -> SourceId;

    /// Look the candidate up and return the first accepted row
    async fn search(
        &self,
        candidate: &CandidateReference,
    ) -> Result<Option<RegistryResult>, SearchError>;
}

/// Send a request under a hard deadline and decode a JSON body
pub(crate) async fn send_json(request: RequestBuilder, timeout: Duration) -> Result<Value, SearchError> {
    match tokio::time::timeout(timeout, async {
        let response = request.send().await?;
        read_json(response).await
    })
    .await
    {
        Ok(result) => result,
        Err(_) => Err(SearchError::Timeout(timeout)),
    }
}

async fn read_json(response: Response) -> Result<Value, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::from_status(status, &body));
    }
    response.json::<Value>().await.map_err(SearchError::from)
}

/// Rows under `results`; anything else is a parse error
pub(crate) fn result_rows(body: &Value) -> Result<&[Value], SearchError> {
    match body.get("results") {
        Some(Value::Array(rows)) => Ok(rows.as_slice()),
        Some(Value::Null) | None if body.is_object() => Ok(&[] as &[Value]),
        _ => Err(SearchError::Parse(
            "expected an object with a `results` array".to_string(),
        )),
    }
}

/// Row scores are clamped into 0..=1
pub(crate) fn clamp_score(score: Option<f64>) -> Option<f64> {
    score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 1.0))
}

/// Identifier as a string whether the registry sends a string or a number
pub(crate) fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
