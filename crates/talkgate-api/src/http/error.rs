//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use talkgate_types::error::{OrchestratorError, RepositoryError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors surfaced by the orchestrator services.
    Orchestrator(OrchestratorError),
    /// Authentication failure.
    Unauthorized(String),
    Validation(String),
    NotFound(String),
    /// Generic internal error.
    Internal(String),
}

impl From<OrchestratorError> for AppError {
    fn from(e: OrchestratorError) -> Self {
        AppError::Orchestrator(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Orchestrator(OrchestratorError::Store(e))
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Orchestrator(OrchestratorError::Validation(msg)) | AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Orchestrator(e @ OrchestratorError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Orchestrator(OrchestratorError::Store(RepositoryError::Conflict(msg))) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Orchestrator(e @ OrchestratorError::Store(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", e.to_string())
            }
            AppError::Orchestrator(e @ OrchestratorError::Gateway(_)) => {
                (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR", e.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = ApiResponse::error(code, &message, uuid::Uuid::now_v7().to_string());
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkgate_types::llm::LlmError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::from(OrchestratorError::Validation("bad plan".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(OrchestratorError::NotFound("user 9".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(RepositoryError::Conflict("dup".into())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(RepositoryError::Decode("plan 'gold'".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(OrchestratorError::Gateway(LlmError::Timeout { timeout_ms: 10 })),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::Unauthorized("no key".into()), StatusCode::UNAUTHORIZED),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_not_found_message() {
        let (_, code, message) = AppError::from(OrchestratorError::NotFound("user 9".into())).parts();
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(message, "user 9 not found");
    }
}
