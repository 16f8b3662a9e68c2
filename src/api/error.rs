//! API error handling for consistent JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::migration::MigrationError;

/// API error type that converts to JSON responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<MigrationError> for ApiError {
    fn from(err: MigrationError) -> Self {
        let message = err.to_string();
        match err {
            MigrationError::NotAuthenticated | MigrationError::TokenExpired => {
                warn!("{}", message);
                Self::unauthorized(format!("{message}. Log in again at /webexlogin"))
            }
            MigrationError::StateMismatch => Self::unauthorized(message),
            MigrationError::InvalidStep { .. } => Self::conflict(message),
            MigrationError::Period(_) => Self::bad_request(message),
            MigrationError::NoHostEmail(_) | MigrationError::Provider(_) => {
                error!("Upstream error: {}", message);
                Self::bad_gateway(message)
            }
            MigrationError::Storage(_) => {
                error!("Storage error: {}", message);
                Self::internal(message)
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
