// src/server/handlers/records.rs

//! The unauthenticated read endpoints over the candidate store (§4.5, §6).

use crate::core::errors::CoordinatorError;
use crate::core::state::CoordinatorState;
use crate::core::store::CandidateRow;
use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct RecordResponse {
    id: i64,
    pwd: String,
    status: i64,
}

impl From<CandidateRow> for RecordResponse {
    fn from(row: CandidateRow) -> Self {
        Self {
            id: row.id,
            pwd: row.pwd,
            status: row.status,
        }
    }
}

pub async fn count(
    State(state): State<Arc<CoordinatorState>>,
) -> Result<Json<serde_json::Value>, CoordinatorError> {
    let count = state.store.count_all().await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

pub async fn get_by_id(
    State(state): State<Arc<CoordinatorState>>,
    Path(id_raw): Path<String>,
) -> Result<Json<RecordResponse>, CoordinatorError> {
    let id: i64 = id_raw
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CoordinatorError::Validation("id must be a positive integer".into()))?;
    let row = state
        .store
        .get_by_id(id)
        .await?
        .ok_or(CoordinatorError::NotFound)?;
    Ok(Json(row.into()))
}

pub async fn get_random(
    State(state): State<Arc<CoordinatorState>>,
) -> Result<Json<RecordResponse>, CoordinatorError> {
    let row = state
        .store
        .get_random()
        .await?
        .ok_or(CoordinatorError::NoData)?;
    Ok(Json(row.into()))
}

pub async fn get_by_passphrase(
    State(state): State<Arc<CoordinatorState>>,
    Path(pwd): Path<String>,
) -> Result<Json<RecordResponse>, CoordinatorError> {
    if pwd.is_empty() {
        return Err(CoordinatorError::Validation(
            "passphrase must not be empty".into(),
        ));
    }
    let row = state
        .store
        .get_by_passphrase(&pwd)
        .await?
        .ok_or(CoordinatorError::NotFound)?;
    Ok(Json(row.into()))
}
