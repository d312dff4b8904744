//! Tenant: the aggregate root that owns every other provisioned resource.

use crate::ids::{BrandId, ClusterId, RegionId, ShardId, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Pending,
    Provisioning,
    Active,
    Failed,
    Suspended,
    Deleting,
    Deleted,
}

impl TenantStatus {
    /// Whether a task of `kind` may still be enqueued against a tenant in
    /// this status. Once deletion begins, only delete-shaped work survives
    /// (see the serializer's drain-on-delete behavior, spec §4.5).
    pub fn accepts_new_non_delete_work(&self) -> bool {
        !matches!(self, TenantStatus::Deleting | TenantStatus::Deleted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub brand_id: BrandId,
    pub region_id: RegionId,
    pub cluster_id: ClusterId,
    /// The tenant's pinned `web`-role shard. Every tenant has exactly one.
    pub shard_id: ShardId,
    pub name: String,
    /// Process-wide-unique POSIX uid, assigned at creation and never
    /// reused.
    pub uid: u32,
    pub sftp_enabled: bool,
    pub ssh_enabled: bool,
    pub disk_quota_mb: u64,
    pub status: TenantStatus,
    pub status_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Tenant {
    pub fn brand_owner(&self) -> BrandId {
        self.brand_id
    }
}
