//! API error types and conversions

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::types::ErrorResponse;
use crate::error::{MonitorError, SupervisorError};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Invalid request body or monitor definition
    InvalidRequest(String),

    /// Missing or malformed credentials
    Unauthorized(String),

    /// Credentials do not match
    Forbidden(String),

    NotFound(String),

    /// Request conflicts with the monitor's current state
    Conflict(String),

    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        let message = err.to_string();
        match err {
            SupervisorError::NotFound(_) => ApiError::NotFound(message),
            SupervisorError::Definition(_) => ApiError::InvalidRequest(message),
            SupervisorError::Monitor(
                MonitorError::AlreadyStarted | MonitorError::AlreadyRegistered(_),
            ) => ApiError::Conflict(message),
            SupervisorError::Monitor(MonitorError::ActionInit { .. } | MonitorError::Exited) => {
                ApiError::Internal(message)
            }
        }
    }
}
