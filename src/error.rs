//! Error types for the scheduler and the HTTP layer.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde_json::json;
use thiserror::Error;

/// Malformed scheduling input. Fails the whole call; nothing is scheduled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid time range for '{field}': end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        field: String,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("duplicate id '{id}' in '{field}'")]
    DuplicateId { field: String, id: String },

    #[error("'{field}' overlaps '{other}'")]
    Overlap { field: String, other: String },

    #[error("schema mismatch: {0}")]
    Schema(String),
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the offending input field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidTimeRange { field, .. }
            | ValidationError::InvalidValue { field, .. }
            | ValidationError::DuplicateId { field, .. }
            | ValidationError::Overlap { field, .. } => Some(field),
            ValidationError::Schema(_) => None,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Schema(err.to_string())
    }
}

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("store error: {0}")]
    Store(#[from] std::io::Error),
}

// Body that fails to deserialize is a schema mismatch, not a generic 422
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::Schema(rejection.body_text()))
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Store(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let field = match &self {
            AppError::Validation(v) => v.field().map(str::to_string),
            _ => None,
        };
        let message = match &self {
            // io details stay in the log
            AppError::Store(_) => "failed to access task store".to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
                "field": field,
            }
        });
        (status, Json(body)).into_response()
    }
}
