//! Tenant CRUD (spec §6.1). Create is synchronous bookkeeping (the row
//! is inserted `pending`) plus starting the tenant's own lifecycle
//! workflow directly -- there's no existing tenant to serialize
//! resource operations against yet, so the M2 serializer doesn't apply
//! here the way it does to `handlers::resources`. Delete starts the
//! cascade workflow and returns `202`.

use crate::authz::{require_brand_access, require_scope};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use hosting_domain::{BrandId, ClusterId, Identity, OrchestrationError, RegionId, ShardId, Tenant, TenantId, TenantStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize)]
pub struct ListTenantsQuery {
    pub brand_id: Option<BrandId>,
}

pub async fn list_tenants(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListTenantsQuery>,
) -> ApiResult<Json<Vec<Tenant>>> {
    require_scope(&identity, "tenant", "read")?;

    let brand_filter: Option<Vec<String>> = match identity.brand_filter() {
        None => query.brand_id.map(|id| vec![id.to_string()]),
        Some(brands) => match query.brand_id {
            Some(id) if brands.iter().any(|b| b == &id.to_string()) => Some(vec![id.to_string()]),
            Some(_) => return Ok(Json(Vec::new())),
            None => Some(brands.to_vec()),
        },
    };

    let tenants = state.store.tenants()?.list(brand_filter.as_deref()).await?;
    Ok(Json(tenants))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(tenant_id): Path<TenantId>,
) -> ApiResult<Json<Tenant>> {
    require_scope(&identity, "tenant", "read")?;
    let tenant = state.store.tenants()?.get(tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;
    Ok(Json(tenant))
}

#[derive(Deserialize)]
pub struct CreateTenantBody {
    pub brand_id: BrandId,
    pub region_id: RegionId,
    pub cluster_id: ClusterId,
    pub shard_id: ShardId,
    pub name: String,
    #[serde(default)]
    pub sftp_enabled: bool,
    #[serde(default)]
    pub ssh_enabled: bool,
    #[serde(default)]
    pub disk_quota_mb: u64,
}

#[derive(Serialize)]
pub struct AcceptedWorkflow {
    pub workflow_id: String,
    pub resource_id: TenantId,
    pub status: &'static str,
}

pub async fn create_tenant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateTenantBody>,
) -> ApiResult<(StatusCode, Json<AcceptedWorkflow>)> {
    require_scope(&identity, "tenant", "write")?;
    require_brand_access(&identity, body.brand_id)?;

    if body.name.trim().is_empty() {
        return Err(ApiError(OrchestrationError::Validation("name must not be empty".to_string())));
    }

    let uid = state.store.tenants()?.reserve_next_uid().await?;

    let now = chrono::Utc::now();
    let tenant = Tenant {
        id: TenantId::new(),
        brand_id: body.brand_id,
        region_id: body.region_id,
        cluster_id: body.cluster_id,
        shard_id: body.shard_id,
        name: body.name,
        uid,
        sftp_enabled: body.sftp_enabled,
        ssh_enabled: body.ssh_enabled,
        disk_quota_mb: body.disk_quota_mb,
        status: TenantStatus::Pending,
        status_message: None,
        created_at: now,
        updated_at: now,
    };
    state.store.tenants()?.create(&tenant).await?;

    // Deliberately not `serializer::workflow_id_for(tenant.id)` -- that id
    // is reserved for the tenant's M2 serializer run, started lazily by
    // the first `serializer::enqueue` call against this tenant. Reusing
    // it here would occupy the row and leave `enqueue`'s `try_start`
    // silently no-op forever after.
    let workflow_id = format!("tenant-create-{}", tenant.id);
    state
        .engine
        .clone()
        .start("CreateTenantWorkflow", &workflow_id, json!({ "tenant_id": tenant.id }), None)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedWorkflow { workflow_id, resource_id: tenant.id, status: "pending" })))
}

pub async fn delete_tenant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(tenant_id): Path<TenantId>,
) -> ApiResult<(StatusCode, Json<AcceptedWorkflow>)> {
    require_scope(&identity, "tenant", "write")?;
    let tenant = state.store.tenants()?.get(tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;

    let workflow_id = format!("tenant-delete-{}", tenant.id);
    state
        .engine
        .clone()
        .start("DeleteTenantWorkflow", &workflow_id, json!({ "tenant_id": tenant.id }), None)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedWorkflow { workflow_id, resource_id: tenant.id, status: "deleting" })))
}
