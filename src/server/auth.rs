// src/server/auth.rs

//! Authentication for mutating endpoints: a single shared secret presented
//! either as `Authorization: Bearer <token>` or a dedicated single-token
//! header (§4.5). Fails closed when no secret is configured.

use crate::core::errors::CoordinatorError;
use crate::core::state::CoordinatorState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

const TOKEN_HEADER: &str = "x-api-token";

/// A zero-sized marker extracted by every mutating handler; its mere
/// presence in the handler signature proves the request carried a valid
/// token, so the body is never checked again downstream.
pub struct AuthToken;

impl FromRequestParts<Arc<CoordinatorState>> for AuthToken {
    type Rejection = CoordinatorError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<CoordinatorState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.api_token.as_deref() else {
            return Err(CoordinatorError::AuthNotConfigured);
        };

        let presented = bearer_token(parts).or_else(|| header_token(parts));

        match presented {
            Some(token) if token == expected => Ok(AuthToken),
            Some(_) => Err(CoordinatorError::AuthInvalid),
            None => Err(CoordinatorError::AuthRequired),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn header_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
