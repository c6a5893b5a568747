// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (lifecycle guard rejections)
    Conflict(String),

    // 500: the 10-attempt room code budget was exhausted
    CodeGenerationExhausted,

    // 500 with a structured kind classified from the record store
    Store(StoreError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::CodeGenerationExhausted => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to generate unique room code" }),
            ),
            AppError::Store(err) => {
                tracing::error!("Store error ({:?}): {}", err.kind, err.message);
                let mut body = json!({ "error": "Record store error" });
                if let Some(hint) = err.kind.hint() {
                    body["hint"] = json!(hint);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Classification of record-store failures. Replaces substring matching on
/// error messages with a structured kind; the user-facing hint is looked up
/// by kind at the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    UniqueViolation,
    MissingColumn,
    PermissionDenied,
    Connection,
    Other,
}

impl StoreErrorKind {
    pub fn hint(self) -> Option<&'static str> {
        match self {
            StoreErrorKind::UniqueViolation => Some("A row with this key already exists."),
            StoreErrorKind::MissingColumn => {
                Some("A schema migration has not been applied. Run the pending migrations.")
            }
            StoreErrorKind::PermissionDenied => {
                Some("The database role is missing a grant for this table.")
            }
            StoreErrorKind::Connection => {
                Some("The database is unreachable. Check DATABASE_URL and that Postgres is up.")
            }
            StoreErrorKind::Other => None,
        }
    }
}

#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn classify(err: &sqlx::Error) -> Self {
        let kind = match err {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => StoreErrorKind::UniqueViolation,
                Some("42703") => StoreErrorKind::MissingColumn,
                Some("42501") => StoreErrorKind::PermissionDenied,
                _ => StoreErrorKind::Other,
            },
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreErrorKind::Connection
            }
            _ => StoreErrorKind::Other,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Converts `sqlx::Error` into a classified `AppError::Store`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::classify(&err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
