//! Region -> Cluster -> Shard -> Node hierarchy.
//!
//! A node can sit in more than one shard; each membership row carries the
//! role the node plays in that shard and a `shard_index` stable for the
//! lifetime of the membership (used, e.g., to pick the primary database
//! node deterministically).

use crate::ids::{BrandId, ClusterId, NodeId, RegionId, ShardId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub region_id: RegionId,
    pub name: String,
    /// Brands permitted to pin tenants to this cluster.
    pub brand_ids: Vec<BrandId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardRole {
    Web,
    Database,
    Dns,
    Valkey,
    Email,
    Storage,
    Dbadmin,
    Lb,
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStatus {
    Active,
    Failed,
    Converging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    pub id: ShardId,
    pub cluster_id: ClusterId,
    pub role: ShardRole,
    pub name: String,
    pub status: ShardStatus,
    pub status_message: Option<String>,
    /// Role-specific config, e.g. `{"cron_interval_minutes": 5}` for a
    /// database shard's replication cadence. Opaque to the core.
    pub role_config: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLiveness {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub hostname: String,
    pub liveness: NodeLiveness,
    pub last_health_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A node's participation in a shard. Index stability is an invariant:
/// once assigned, `shard_index` never changes for the lifetime of the
/// membership, even if other members are removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeShardMembership {
    pub node_id: NodeId,
    pub shard_id: ShardId,
    pub shard_role: ShardRole,
    pub shard_index: u32,
}
