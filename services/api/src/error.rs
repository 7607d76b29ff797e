//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing input
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// Missing, malformed or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to touch the resource
    #[error("{0}")]
    Forbidden(String),

    /// No record with the requested id
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The write collides with existing state
    #[error("{0}")]
    Conflict(String),

    /// Declared operation without an implementation
    #[error("Not implemented")]
    NotImplemented,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    /// Validation error without field details
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Error for a path id that is not a well-formed identifier
    pub fn invalid_id(resource: &str) -> Self {
        Self::validation(format!("Invalid {} ID", resource))
    }

    /// HTTP status carried by this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// Error envelope returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error_message, message, details) = match self {
            ApiError::Validation { message, details } => {
                ("Validation failed".to_string(), Some(message), details)
            }
            ApiError::Unauthorized(msg) | ApiError::Forbidden(msg) | ApiError::Conflict(msg) => {
                (msg, None, None)
            }
            ApiError::NotFound(resource) => (format!("{} not found", resource), None, None),
            ApiError::NotImplemented => ("Not implemented".to_string(), None, None),
            ApiError::InternalServerError => ("Internal server error".to_string(), None, None),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                ("Internal server error".to_string(), None, None)
            }
        };

        let body = Json(ErrorBody {
            error: error_message,
            message,
            details,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
