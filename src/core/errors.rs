// src/core/errors.rs

//! Defines the primary error type shared by the coordinator and worker.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the coordinator.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("NOAUTH token required but not configured")]
    AuthNotConfigured,

    #[error("NOAUTH authentication required")]
    AuthRequired,

    #[error("invalid token")]
    AuthInvalid,

    #[error("not found")]
    NotFound,

    #[error("no data")]
    NoData,

    #[error("policy denied: {0}")]
    PolicyDenied(String),

    #[error("store error: {0}")]
    Store(Arc<sqlx::Error>),

    #[error("stats cache is updating")]
    StatsUpdating,

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("internal error: {0}")]
    Internal(String),
}

// Manual implementation of Clone because `sqlx::Error` and `std::io::Error` are not cloneable.
// We wrap them in an Arc to allow for cheap, shared cloning.
impl Clone for CoordinatorError {
    fn clone(&self) -> Self {
        match self {
            CoordinatorError::Validation(s) => CoordinatorError::Validation(s.clone()),
            CoordinatorError::AuthNotConfigured => CoordinatorError::AuthNotConfigured,
            CoordinatorError::AuthRequired => CoordinatorError::AuthRequired,
            CoordinatorError::AuthInvalid => CoordinatorError::AuthInvalid,
            CoordinatorError::NotFound => CoordinatorError::NotFound,
            CoordinatorError::NoData => CoordinatorError::NoData,
            CoordinatorError::PolicyDenied(s) => CoordinatorError::PolicyDenied(s.clone()),
            CoordinatorError::Store(e) => CoordinatorError::Store(Arc::clone(e)),
            CoordinatorError::StatsUpdating => CoordinatorError::StatsUpdating,
            CoordinatorError::Io(e) => CoordinatorError::Io(Arc::clone(e)),
            CoordinatorError::Internal(s) => CoordinatorError::Internal(s.clone()),
        }
    }
}

impl PartialEq for CoordinatorError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CoordinatorError::Validation(a), CoordinatorError::Validation(b)) => a == b,
            (CoordinatorError::PolicyDenied(a), CoordinatorError::PolicyDenied(b)) => a == b,
            (CoordinatorError::Store(a), CoordinatorError::Store(b)) => {
                a.to_string() == b.to_string()
            }
            (CoordinatorError::Io(a), CoordinatorError::Io(b)) => a.to_string() == b.to_string(),
            (CoordinatorError::Internal(a), CoordinatorError::Internal(b)) => a == b,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl CoordinatorError {
    fn status_code(&self) -> StatusCode {
        match self {
            CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::AuthNotConfigured => StatusCode::UNAUTHORIZED,
            CoordinatorError::AuthRequired => StatusCode::UNAUTHORIZED,
            CoordinatorError::AuthInvalid => StatusCode::FORBIDDEN,
            CoordinatorError::NotFound => StatusCode::NOT_FOUND,
            CoordinatorError::NoData => StatusCode::BAD_REQUEST,
            CoordinatorError::PolicyDenied(_) => StatusCode::FORBIDDEN,
            CoordinatorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::StatsUpdating => StatusCode::SERVICE_UNAVAILABLE,
            CoordinatorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Every HTTP handler returns `Result<_, CoordinatorError>`; this turns the error
/// into the `{error:"<message>"}` envelope described for the request surface.
impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            CoordinatorError::AuthNotConfigured => "token required but not configured".to_string(),
            CoordinatorError::AuthInvalid => "invalid token".to_string(),
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// --- From trait implementations for easy error conversion ---

impl From<sqlx::Error> for CoordinatorError {
    fn from(e: sqlx::Error) -> Self {
        CoordinatorError::Store(Arc::new(e))
    }
}

impl From<std::io::Error> for CoordinatorError {
    fn from(e: std::io::Error) -> Self {
        CoordinatorError::Io(Arc::new(e))
    }
}
