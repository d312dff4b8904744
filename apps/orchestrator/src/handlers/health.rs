//! The unauthenticated liveness probe, distinct from the node-agent
//! `/internal/v1/nodes/{id}/health` self-report endpoint. Bypasses both
//! `auth_guard` and `health_guard` (spec §6.1).

use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
