// src/server/handlers/work.rs

//! The authenticated work surface: lease, report, found-confirm, sweeper
//! trigger, and the policy-gated reset endpoints (§4.5, §6).

use crate::core::errors::CoordinatorError;
use crate::core::state::CoordinatorState;
use crate::core::store::{STALE_LEASE_SECONDS, batch_size_for};
use crate::core::wallet::WalletDescriptor;
use crate::server::auth::AuthToken;
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestBody {
    cpu_count: i64,
    client_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestResponse {
    success: bool,
    passwords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encrypt: Option<WalletDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_found: Option<bool>,
}

pub async fn request(
    _auth: AuthToken,
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<WorkRequestBody>,
) -> Result<Json<WorkRequestResponse>, CoordinatorError> {
    if body.client_id.is_empty() {
        return Err(CoordinatorError::Validation("worker_id is required".into()));
    }
    state.liveness.touch(&body.client_id);

    if state.latch.is_found() {
        return Ok(Json(WorkRequestResponse {
            success: false,
            passwords: vec![],
            encrypt: None,
            batch_id: None,
            count: None,
            password_found: Some(true),
        }));
    }

    let n = batch_size_for(body.cpu_count);
    let reserved = state.store.reserve_batch(n).await?;
    if reserved.is_empty() {
        return Ok(Json(WorkRequestResponse {
            success: false,
            passwords: vec![],
            encrypt: None,
            batch_id: None,
            count: None,
            password_found: None,
        }));
    }

    let issued_at_millis = Utc::now().timestamp_millis();
    let batch_id = format!("{}-{}", body.client_id, issued_at_millis);
    let passwords: Vec<String> = reserved.into_iter().map(|row| row.pwd).collect();
    let count = passwords.len() as i64;

    Ok(Json(WorkRequestResponse {
        success: true,
        passwords,
        encrypt: Some(state.wallet.clone()),
        batch_id: Some(batch_id),
        count: Some(count),
        password_found: None,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkResultBody {
    #[allow(dead_code)]
    batch_id: String,
    client_id: String,
    success: bool,
    #[serde(default)]
    found_password: Option<String>,
    #[serde(default)]
    passwords: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkResultResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    should_stop: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_found: Option<bool>,
}

pub async fn result(
    _auth: AuthToken,
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<WorkResultBody>,
) -> Result<Json<WorkResultResponse>, CoordinatorError> {
    state.liveness.touch(&body.client_id);

    if body.success {
        let found = body
            .found_password
            .ok_or_else(|| CoordinatorError::Validation("foundPassword is required on success".into()))?;
        // The latch is set BEFORE acknowledging the worker so a crash between
        // the two leaves it durable (§4.3).
        state.latch.confirm(&found, &body.client_id).await?;
        if !body.passwords.is_empty() {
            state.store.mark_checked_by_passphrase(&body.passwords).await?;
        }
        return Ok(Json(WorkResultResponse {
            success: true,
            message: "password found, latch set".to_string(),
            should_stop: Some(true),
            password_found: Some(true),
        }));
    }

    state
        .store
        .mark_checked_by_passphrase(&body.passwords)
        .await?;

    Ok(Json(WorkResultResponse {
        success: true,
        message: format!("{} candidates marked checked", body.passwords.len()),
        should_stop: Some(state.latch.is_found()),
        password_found: if state.latch.is_found() { Some(true) } else { None },
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkFoundBody {
    password: String,
    client_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkFoundResponse {
    success: bool,
    password_found: bool,
}

pub async fn found(
    _auth: AuthToken,
    State(state): State<Arc<CoordinatorState>>,
    Json(body): Json<WorkFoundBody>,
) -> Result<Json<WorkFoundResponse>, CoordinatorError> {
    // Idempotent by design: the coordinator appends an audit stanza every
    // time, even if `/work/result` already set the latch for this candidate
    // (§9, double-reporting is intentional, not deduplicated).
    state.latch.confirm(&body.password, &body.client_id).await?;
    Ok(Json(WorkFoundResponse {
        success: true,
        password_found: true,
    }))
}

pub async fn reset_timeout(
    _auth: AuthToken,
    State(state): State<Arc<CoordinatorState>>,
) -> Result<Json<serde_json::Value>, CoordinatorError> {
    let reset_count = state.store.reclaim_stale(STALE_LEASE_SECONDS).await?;
    Ok(Json(json!({ "success": true, "resetCount": reset_count })))
}

pub async fn reset_found(
    _auth: AuthToken,
    State(state): State<Arc<CoordinatorState>>,
) -> Result<Json<serde_json::Value>, CoordinatorError> {
    if !state.config.reset_allowed() {
        return Err(CoordinatorError::PolicyDenied(
            "reset is only permitted on a sample store".into(),
        ));
    }
    state.latch.reset().await?;
    let reset_count = state.store.reset_all().await?;
    Ok(Json(json!({ "success": true, "resetCount": reset_count })))
}

pub async fn stats(
    State(state): State<Arc<CoordinatorState>>,
) -> Result<Json<serde_json::Value>, CoordinatorError> {
    let active_clients_list = state.liveness.active_worker_ids();

    let snapshot = match state.stats_cache.get(&state.store).await {
        Ok(snapshot) => snapshot,
        Err(CoordinatorError::StatsUpdating) => {
            return Ok(Json(json!({
                "status": "updating",
                "database": state.config.db_name,
                "resetAllowed": state.config.reset_allowed(),
                "tokenRequired": state.config.api_token.is_some(),
                "activeClients": active_clients_list.len(),
                "activeClientsList": active_clients_list,
                "uptime": state.uptime_millis(),
                "uptimeFormatted": state.uptime_formatted(),
            })));
        }
        Err(e) => return Err(e),
    };

    Ok(Json(json!({
        "uncheck": snapshot.uncheck,
        "checking": snapshot.checking,
        "checked": snapshot.checked,
        "timeout": snapshot.timeout,
        "total": snapshot.total,
        "progress": snapshot.progress,
        "passwordFound": state.latch.is_found(),
        "database": state.config.db_name,
        "resetAllowed": state.config.reset_allowed(),
        "tokenRequired": state.config.api_token.is_some(),
        "activeClients": active_clients_list.len(),
        "activeClientsList": active_clients_list,
        "updated_at": Utc::now().timestamp(),
        "uptime": state.uptime_millis(),
        "uptimeFormatted": state.uptime_formatted(),
    })))
}
