//! Tagged API error type shared by every handler.
//!
//! Each failure carries a machine-readable kind so callers can branch on
//! the category instead of re-parsing message strings. The JSON shape is
//! `{"detail": "...", "code": "..."}` on every non-2xx response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Category of an API failure, mapped one-to-one onto an HTTP status.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input rejected by a domain rule or malformed field (400)
    Validation,
    /// No valid session (401)
    Unauthorized,
    /// Valid session but insufficient role (403)
    Forbidden,
    /// Uniqueness or state conflict, e.g. duplicate review (409)
    Conflict,
    /// Referenced record does not exist or is not visible (404)
    NotFound,
    /// Storage or serialization failure (500)
    Internal,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ApiError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Validation, detail: detail.into() }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Unauthorized, detail: detail.into() }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Forbidden, detail: detail.into() }
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Conflict, detail: detail.into() }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self { kind: ErrorKind::NotFound, detail: detail.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Internal, detail: detail.into() }
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::Internal {
            tracing::error!(detail = %self.detail, "internal error");
        }
        let body = json!({
            "detail": self.detail,
            "code": self.kind,
        });
        (self.status(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

// Storage and serialization failures all surface as 500s.

impl From<redb::TransactionError> for ApiError {
    fn from(err: redb::TransactionError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<redb::TableError> for ApiError {
    fn from(err: redb::TableError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<redb::StorageError> for ApiError {
    fn from(err: redb::StorageError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<redb::CommitError> for ApiError {
    fn from(err: redb::CommitError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(err.to_string())
    }
}
