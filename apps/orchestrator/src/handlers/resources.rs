//! Generic tenant-owned resource CRUD (spec §4.6, §6.1). One handler set
//! serves all 22 `ResourceKind`s: the kind is a path segment, parsed the
//! same way every enum in this crate round-trips through JSON.

use crate::authz::require_brand_access;
use crate::error::{ApiError, ApiResult};
use crate::services::workflows::{create_workflow_name, delete_workflow_name};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use hosting_domain::{Identity, OrchestrationError, Resource, ResourceId, ResourceKind, ResourceStatus, TenantId};
use hosting_workflow::serializer::{self, ProvisionTask};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn parse_kind(raw: &str) -> ApiResult<ResourceKind> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| ApiError(OrchestrationError::Validation(format!("unknown resource kind '{raw}'"))))
}

#[derive(Deserialize)]
pub struct ListResourcesQuery {
    pub parent_id: Option<ResourceId>,
}

pub async fn list_resources(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((tenant_id, kind)): Path<(TenantId, String)>,
    Query(query): Query<ListResourcesQuery>,
) -> ApiResult<Json<Vec<Resource>>> {
    let tenant = state.store.tenants()?.get(tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;

    let kind = parse_kind(&kind)?;
    let all = state.store.resources()?.list_by_tenant(tenant_id, Some(kind)).await?;
    let filtered = match query.parent_id {
        Some(parent_id) => all.into_iter().filter(|r| r.parent_id == Some(parent_id)).collect(),
        None => all,
    };
    Ok(Json(filtered))
}

pub async fn get_resource(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(resource_id): Path<ResourceId>,
) -> ApiResult<Json<Resource>> {
    let resource = state.store.resources()?.get(resource_id).await?;
    let tenant = state.store.tenants()?.get(resource.tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;
    Ok(Json(resource))
}

#[derive(Deserialize)]
pub struct CreateResourceBody {
    #[serde(default)]
    pub parent_id: Option<ResourceId>,
    pub payload: Value,
}

#[derive(Serialize)]
pub struct AcceptedResource {
    pub workflow_id: String,
    pub resource_id: ResourceId,
    pub status: &'static str,
}

/// A resource's natural key is (tenant, parent, kind, payload) -- two
/// requests that agree on all four describe the same logical resource
/// (spec §8: "creating resource X twice with the same natural key
/// yields the same id ... never two resources"). A `deleted` match
/// doesn't count: recreating a resource after it's gone is a new one.
fn status_label(status: ResourceStatus) -> &'static str {
    match status {
        ResourceStatus::Pending => "pending",
        ResourceStatus::Provisioning => "provisioning",
        ResourceStatus::Active => "active",
        ResourceStatus::Failed => "failed",
        ResourceStatus::Deleting => "deleting",
        ResourceStatus::Deleted => "deleted",
    }
}

pub async fn create_resource(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((tenant_id, kind)): Path<(TenantId, String)>,
    Json(body): Json<CreateResourceBody>,
) -> ApiResult<(StatusCode, Json<AcceptedResource>)> {
    let tenant = state.store.tenants()?.get(tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;

    if !tenant.status.accepts_new_non_delete_work() {
        return Err(ApiError(OrchestrationError::Conflict(format!("tenant {tenant_id} is being deleted"))));
    }

    let kind = parse_kind(&kind)?;

    let existing = state.store.resources()?.list_by_tenant(tenant_id, Some(kind)).await?;
    if let Some(dup) = existing
        .iter()
        .find(|r| r.parent_id == body.parent_id && r.payload == body.payload && r.status != ResourceStatus::Deleted)
    {
        return Ok((
            StatusCode::OK,
            Json(AcceptedResource {
                workflow_id: format!("resource-create-{}", dup.id),
                resource_id: dup.id,
                status: status_label(dup.status),
            }),
        ));
    }

    let now = chrono::Utc::now();
    let resource = Resource {
        id: ResourceId::new(),
        tenant_id,
        parent_id: body.parent_id,
        kind,
        payload: body.payload,
        status: ResourceStatus::Pending,
        status_message: None,
        created_at: now,
        updated_at: now,
    };
    state.store.resources()?.create(&resource).await?;

    let workflow_id = format!("resource-create-{}", resource.id);
    serializer::enqueue(
        &state.engine,
        tenant_id,
        ProvisionTask {
            workflow_name: create_workflow_name(kind),
            workflow_id: workflow_id.clone(),
            args: json!({ "resource_id": resource.id }),
            callback_url: None,
            resource_type: Some(format!("{kind:?}")),
            resource_id: Some(resource.id.to_string()),
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResource { workflow_id, resource_id: resource.id, status: "pending" })))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(resource_id): Path<ResourceId>,
) -> ApiResult<(StatusCode, Json<AcceptedResource>)> {
    let resource = state.store.resources()?.get(resource_id).await?;
    let tenant = state.store.tenants()?.get(resource.tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;

    let workflow_id = format!("resource-delete-{}", resource_id);
    serializer::enqueue(
        &state.engine,
        resource.tenant_id,
        ProvisionTask {
            workflow_name: delete_workflow_name(resource.kind),
            workflow_id: workflow_id.clone(),
            args: json!({ "resource_id": resource_id }),
            callback_url: None,
            resource_type: Some(format!("{:?}", resource.kind)),
            resource_id: Some(resource_id.to_string()),
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResource { workflow_id, resource_id, status: "deleting" })))
}

/// Re-enqueues the same create/delete workflow a `failed` resource was
/// last attempted under -- resumable, not restarted from scratch (spec
/// §7: "failed is resumable").
pub async fn retry_resource(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(resource_id): Path<ResourceId>,
) -> ApiResult<(StatusCode, Json<AcceptedResource>)> {
    let resource = state.store.resources()?.get(resource_id).await?;
    let tenant = state.store.tenants()?.get(resource.tenant_id).await?;
    require_brand_access(&identity, tenant.brand_id)?;

    if resource.status != ResourceStatus::Failed {
        return Err(ApiError(OrchestrationError::Validation("only a failed resource can be retried".to_string())));
    }

    // A retry always gets a fresh workflow id: the original run's id is
    // already a terminal row, and `start` treats a repeat of the same id
    // as a no-op rather than a new attempt.
    let attempt = ResourceId::new();
    let (workflow_name, workflow_id, status) = if resource.status_message.as_deref().map(|m| m.contains("delete")).unwrap_or(false) {
        (delete_workflow_name(resource.kind), format!("resource-delete-{resource_id}-retry-{attempt}"), "deleting")
    } else {
        (create_workflow_name(resource.kind), format!("resource-create-{resource_id}-retry-{attempt}"), "pending")
    };

    serializer::enqueue(
        &state.engine,
        resource.tenant_id,
        ProvisionTask {
            workflow_name,
            workflow_id: workflow_id.clone(),
            args: json!({ "resource_id": resource_id }),
            callback_url: None,
            resource_type: Some(format!("{:?}", resource.kind)),
            resource_id: Some(resource_id.to_string()),
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResource { workflow_id, resource_id, status })))
}
