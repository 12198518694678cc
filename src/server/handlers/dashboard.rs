// src/server/handlers/dashboard.rs

//! The unauthenticated dashboard document and health probe.

use axum::Json;
use axum::response::{Html, IntoResponse};
use serde_json::json;

const DASHBOARD_HTML: &str = include_str!("../../../templates/dashboard.html");

pub async fn dashboard() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
