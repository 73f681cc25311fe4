//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::communications::CommunicationsError;
use crate::gateway::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid invoice at index {index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidItem { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Query(QueryError::Bootstrap(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_UNAVAILABLE")
            }
            ApiError::Query(e) if e.is_constraint_violation() => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CONSTRAINT_VIOLATION")
            }
            ApiError::Query(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            ApiError::Query(QueryError::Bootstrap(_)) => {
                "Database is not available. Please try again later.".to_string()
            }
            ApiError::Query(e) if e.is_constraint_violation() => {
                "Invoice references an unknown customer.".to_string()
            }
            _ if status.is_server_error() => {
                error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let index = match &self {
            ApiError::InvalidItem { index, .. } => Some(*index),
            _ => None,
        };

        let body = ErrorResponse {
            error: message,
            code,
            index,
        };

        (status, Json(body)).into_response()
    }
}

impl From<CommunicationsError> for ApiError {
    fn from(err: CommunicationsError) -> Self {
        match err {
            CommunicationsError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CommunicationsError::Invalid { .. } => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::Store(e) => ApiError::Query(e),
            AuthError::Hash(e) => ApiError::Internal(e),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
