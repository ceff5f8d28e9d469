//! Error type shared by the pipeline, the CLI, and the HTTP surface.
//!
//! Partition-level failures never reach the caller as a `NewsError`; the
//! search orchestrator logs them and degrades to an empty window. What does
//! surface here is request-level: bad input, every window failing, or the
//! summary collaborator giving up.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not allowed, use {0}")]
    MethodNotAllowed(&'static str),

    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("request timed out")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("all {failed} feed windows failed")]
    AllWindowsFailed { failed: usize },

    #[error("summary is unavailable: no API key configured")]
    SummaryUnavailable,

    #[error("summary failed: {0}")]
    Summary(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for NewsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NewsError::Timeout
        } else {
            NewsError::Http(e)
        }
    }
}

impl NewsError {
    pub fn status(&self) -> StatusCode {
        match self {
            NewsError::MissingParameter(_) | NewsError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            NewsError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            NewsError::Upstream { .. }
            | NewsError::Timeout
            | NewsError::Http(_)
            | NewsError::AllWindowsFailed { .. } => StatusCode::BAD_GATEWAY,
            NewsError::SummaryUnavailable
            | NewsError::Summary(_)
            | NewsError::Config(_)
            | NewsError::Io(_)
            | NewsError::Json(_)
            | NewsError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NewsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            NewsError::MissingParameter("q").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            NewsError::MethodNotAllowed("POST").status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            NewsError::AllWindowsFailed { failed: 2 }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            NewsError::SummaryUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_has_error_body() {
        let response = NewsError::MissingParameter("q").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "missing parameter: q");
    }
}
