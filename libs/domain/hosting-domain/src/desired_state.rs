//! `DesiredState`: the fully denormalized, per-node snapshot produced by
//! the projector (H1) and delivered to node agents by the convergence
//! loop (H2). Never persisted as a first-class record -- it exists only
//! during delivery.
//!
//! All list fields are sorted by a stable key before emission and all
//! maps are emitted in key-sorted order, so that `project(db, node)` is
//! byte-identical across calls with unchanged inputs (spec §4.7, §8).

use crate::ids::{NodeId, ResourceId, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebEnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebWebroot {
    pub id: ResourceId,
    pub runtime: String,
    pub runtime_version: String,
    pub config: serde_json::Value,
    /// Sorted by `name` for determinism.
    pub env_vars: Vec<WebEnvVar>,
    pub public_folder: String,
    pub env_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebFqdn {
    pub id: ResourceId,
    pub hostname: String,
    pub ssl_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebCronJob {
    pub id: ResourceId,
    pub schedule: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebDaemon {
    pub id: ResourceId,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebTenant {
    pub id: TenantId,
    pub uid: u32,
    pub sftp_enabled: bool,
    pub ssh_enabled: bool,
    /// Sorted by id.
    pub webroots: Vec<WebWebroot>,
    /// Sorted by id.
    pub fqdns: Vec<WebFqdn>,
    /// Sorted by id.
    pub cron_jobs: Vec<WebCronJob>,
    /// Sorted by id.
    pub daemons: Vec<WebDaemon>,
    /// SSH key fingerprints only -- never the private material.
    pub ssh_key_fingerprints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseUserEntry {
    pub id: ResourceId,
    pub username: String,
    pub credential: String,
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseAccessRuleEntry {
    pub database_user_id: ResourceId,
    pub source_cidr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseEntry {
    pub id: ResourceId,
    pub tenant_id: TenantId,
    pub engine: String,
    pub name: String,
    /// Sorted by id.
    pub users: Vec<DatabaseUserEntry>,
    /// Sorted by `(database_user_id, source_cidr)`.
    pub access_rules: Vec<DatabaseAccessRuleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValkeyUserEntry {
    pub id: ResourceId,
    pub username: String,
    pub credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValkeyInstanceEntry {
    pub id: ResourceId,
    pub tenant_id: TenantId,
    pub port: u16,
    pub password: String,
    pub max_memory_mb: u32,
    /// Sorted by id.
    pub users: Vec<ValkeyUserEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LbMapping {
    pub fqdn: String,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageBucketEntry {
    pub bucket: String,
    pub tenant_id: TenantId,
}

/// A per-node snapshot, shaped by the node's shard role. `dns` nodes are
/// not projected here -- they consume zone/record state through a
/// separate side-channel (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DesiredState {
    Web {
        node_id: NodeId,
        /// Sorted by tenant id.
        tenants: Vec<WebTenant>,
    },
    Database {
        node_id: NodeId,
        /// Sorted by id.
        databases: Vec<DatabaseEntry>,
    },
    Valkey {
        node_id: NodeId,
        /// Sorted by id.
        instances: Vec<ValkeyInstanceEntry>,
    },
    Lb {
        node_id: NodeId,
        /// Sorted by `(fqdn, backend)`.
        mappings: Vec<LbMapping>,
    },
    Storage {
        node_id: NodeId,
        /// Sorted by `(tenant_id, bucket)`.
        buckets: Vec<StorageBucketEntry>,
    },
}

impl DesiredState {
    pub fn node_id(&self) -> NodeId {
        match self {
            DesiredState::Web { node_id, .. }
            | DesiredState::Database { node_id, .. }
            | DesiredState::Valkey { node_id, .. }
            | DesiredState::Lb { node_id, .. }
            | DesiredState::Storage { node_id, .. } => *node_id,
        }
    }
}
