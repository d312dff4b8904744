//! API key lifecycle (spec §4.1, §6.1). The raw credential is returned
//! exactly once, at creation time; only its hash is ever persisted or
//! read back.

use crate::authz::require_scope;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use hosting_domain::{hash_credential, ApiKey, ApiKeyId, Identity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize)]
pub struct ApiKeyView {
    pub id: ApiKeyId,
    pub name: String,
    pub scopes: Vec<String>,
    pub brands: Vec<String>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<ApiKey> for ApiKeyView {
    fn from(key: ApiKey) -> Self {
        Self { id: key.id, name: key.name, scopes: key.scopes, brands: key.brands, revoked_at: key.revoked_at }
    }
}

pub async fn list_api_keys(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> ApiResult<Json<Vec<ApiKeyView>>> {
    require_scope(&identity, "api_key", "read")?;
    let keys = state.store.api_keys()?.list().await?;
    Ok(Json(keys.into_iter().map(ApiKeyView::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateApiKeyBody {
    pub name: String,
    pub scopes: Vec<String>,
    pub brands: Vec<String>,
}

#[derive(Serialize)]
pub struct CreatedApiKey {
    pub id: ApiKeyId,
    pub key: String,
}

/// `POST /api/v1/api-keys` only ever sees `name`/`scopes`/`brands` in its
/// own body; a caller passing arbitrary extra fields (a `password`, say)
/// just has them ignored here -- and still redacted on the way into the
/// audit log, since that capture runs on the raw request body.
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateApiKeyBody>,
) -> ApiResult<(StatusCode, Json<CreatedApiKey>)> {
    require_scope(&identity, "api_key", "write")?;

    let raw_key = format!("hak_{}", Uuid::new_v4().simple());
    let key = ApiKey {
        id: ApiKeyId::new(),
        name: body.name,
        key_hash: hash_credential(&raw_key),
        scopes: body.scopes,
        brands: body.brands,
        revoked_at: None,
    };
    state.store.api_keys()?.create(&key).await?;

    Ok((StatusCode::CREATED, Json(CreatedApiKey { id: key.id, key: raw_key })))
}

pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(key_id): Path<ApiKeyId>,
) -> ApiResult<StatusCode> {
    require_scope(&identity, "api_key", "write")?;
    state.store.api_keys()?.revoke(key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
