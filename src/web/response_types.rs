//! # Web API Error Types
//!
//! HTTP mapping of [`MonitorError`] via Axum's `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::MonitorError;
use crate::logging::log_error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Access denied: {reason}")]
    Forbidden { reason: String },

    #[error("Authentication required: {reason}")]
    Unauthorized { reason: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            ApiError::NotFound { resource } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.as_str())
            }

            ApiError::Forbidden { reason } => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.as_str()),

            // Details of failed authentication stay in the log
            ApiError::Unauthorized { .. } => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required",
            ),

            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.as_str())
            }

            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            e if e.is_unauthorized() => ApiError::unauthorized(e.to_string()),
            MonitorError::AccessViolation(reason) => ApiError::Forbidden { reason },
            MonitorError::BadRequest(message) => ApiError::BadRequest { message },
            MonitorError::NotFound(resource) => ApiError::NotFound { resource },
            other => {
                log_error("web", "request", &other.to_string(), None);
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for web API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_error_mapping() {
        let status = |e: MonitorError| ApiError::from(e).into_response().status();
        assert_eq!(status(MonitorError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(MonitorError::TaskHubNotAllowed("h".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(MonitorError::InvalidTaskHubName("h".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(MonitorError::AccessViolation("w".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(MonitorError::BadRequest("b".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(MonitorError::NotFound("i".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(MonitorError::storage("down")), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
