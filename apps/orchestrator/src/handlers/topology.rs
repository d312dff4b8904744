//! Shards, nodes, and shard membership -- the platform-admin surface
//! over the topology H1/H2 operate on.

use crate::authz::require_scope;
use crate::services::convergence;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use hosting_domain::{ClusterId, Identity, Node, NodeId, NodeShardMembership, Shard, ShardId, ShardRole};
use serde::{Deserialize, Serialize};

pub async fn list_shards_by_cluster(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(cluster_id): Path<ClusterId>,
) -> ApiResult<Json<Vec<Shard>>> {
    require_scope(&identity, "shard", "read")?;
    Ok(Json(state.store.topology()?.list_shards_by_cluster(cluster_id).await?))
}

pub async fn get_shard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(shard_id): Path<ShardId>,
) -> ApiResult<Json<Shard>> {
    require_scope(&identity, "shard", "read")?;
    Ok(Json(state.store.topology()?.get_shard(shard_id).await?))
}

#[derive(Deserialize)]
pub struct CreateShardBody {
    pub cluster_id: ClusterId,
    pub role: ShardRole,
    pub name: String,
    #[serde(default)]
    pub role_config: serde_json::Value,
}

pub async fn create_shard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateShardBody>,
) -> ApiResult<Json<Shard>> {
    require_scope(&identity, "shard", "write")?;
    let shard = Shard {
        id: ShardId::new(),
        cluster_id: body.cluster_id,
        role: body.role,
        name: body.name,
        status: hosting_domain::ShardStatus::Converging,
        status_message: None,
        role_config: body.role_config,
    };
    state.store.topology()?.create_shard(&shard).await?;
    Ok(Json(shard))
}

#[derive(Serialize)]
pub struct ConvergeAccepted {
    pub workflow_id: String,
}

#[derive(Deserialize)]
pub struct ConvergeBody {
    #[serde(default = "default_fanout")]
    pub fanout: usize,
}

fn default_fanout() -> usize {
    8
}

pub async fn converge_shard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(shard_id): Path<ShardId>,
    Json(body): Json<ConvergeBody>,
) -> ApiResult<(StatusCode, Json<ConvergeAccepted>)> {
    require_scope(&identity, "shard", "write")?;
    convergence::trigger(&state.engine, shard_id, body.fanout.max(1)).await?;
    Ok((StatusCode::ACCEPTED, Json(ConvergeAccepted { workflow_id: convergence::workflow_id_for(shard_id) })))
}

pub async fn list_nodes_by_shard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(shard_id): Path<ShardId>,
) -> ApiResult<Json<Vec<NodeShardMembership>>> {
    require_scope(&identity, "node", "read")?;
    Ok(Json(state.store.topology()?.list_memberships_by_shard(shard_id).await?))
}

pub async fn get_node(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(node_id): Path<NodeId>,
) -> ApiResult<Json<Node>> {
    require_scope(&identity, "node", "read")?;
    Ok(Json(state.store.topology()?.get_node(node_id).await?))
}

#[derive(Deserialize)]
pub struct UpsertNodeBody {
    pub id: NodeId,
    pub hostname: String,
}

pub async fn upsert_node(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UpsertNodeBody>,
) -> ApiResult<Json<Node>> {
    require_scope(&identity, "node", "write")?;
    let node = Node { id: body.id, hostname: body.hostname, liveness: hosting_domain::NodeLiveness::Unknown, last_health_at: None };
    state.store.topology()?.upsert_node(&node).await?;
    Ok(Json(node))
}

#[derive(Deserialize)]
pub struct AddMembershipBody {
    pub node_id: NodeId,
    pub role: ShardRole,
}

#[derive(Serialize)]
pub struct MembershipCreated {
    pub shard_index: u32,
}

pub async fn add_membership(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(shard_id): Path<ShardId>,
    Json(body): Json<AddMembershipBody>,
) -> ApiResult<Json<MembershipCreated>> {
    require_scope(&identity, "node", "write")?;
    let shard_index = state.store.topology()?.add_membership(shard_id, body.node_id, body.role).await?;
    Ok(Json(MembershipCreated { shard_index }))
}

pub async fn remove_membership(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((shard_id, node_id)): Path<(ShardId, NodeId)>,
) -> ApiResult<StatusCode> {
    require_scope(&identity, "node", "write")?;
    state.store.topology()?.remove_membership(shard_id, node_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
