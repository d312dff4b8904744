//! L1 authentication gate and the operational-mode circuit breaker.
//! Modeled on the teacher's `health_guard`/`auth_guard` pair: a 503 short-
//! circuit ahead of the route tree, and an extension-injecting gate that
//! lets handlers take `Extension<Identity>` instead of re-deriving it.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hosting_domain::{hash_credential, Identity};
use serde_json::json;

pub async fn health_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.is_operational() {
        Ok(()) => next.run(req).await,
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "service unavailable", "reason": reason })),
        )
            .into_response(),
    }
}

/// Extracts `X-API-Key`, hashes it, and looks it up among non-revoked
/// keys (spec §4.1). Rejection is a flat 401 whether the key never
/// existed or was revoked -- no distinguishing signal either way.
pub async fn auth_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let raw_key = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    let key_hash = hash_credential(&raw_key);
    let api_keys = state.store.api_keys().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let api_key = api_keys.find_by_hash(&key_hash).await.map_err(|_| StatusCode::UNAUTHORIZED)?;

    let identity = Identity { api_key_id: api_key.id, scopes: api_key.scopes, brands: api_key.brands };
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
