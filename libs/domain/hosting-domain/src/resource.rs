//! Tenant-owned resources: webroots, fqdns, certificates, zones and
//! records, databases, valkey instances, s3 buckets, ssh keys, email,
//! daemons, cron jobs, env vars, backups, egress rules and wireguard
//! peers.
//!
//! All of these share the same lifecycle shape (`status`,
//! `status_message`, timestamps, a parent in a strict tree rooted at the
//! tenant) so they are modeled here as one `Resource` envelope carrying a
//! `ResourceKind`-tagged payload, rather than twenty-odd near-identical
//! structs. The concrete relational schema is explicitly out of scope
//! (spec §1); this is the shape the core's own operations (§6) need.

use crate::ids::{ResourceId, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Provisioning,
    Active,
    Failed,
    Deleting,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Webroot,
    Fqdn,
    Certificate,
    Zone,
    ZoneRecord,
    Database,
    DatabaseUser,
    DatabaseAccessRule,
    ValkeyInstance,
    ValkeyUser,
    S3Bucket,
    S3AccessKey,
    SshKey,
    EmailAccount,
    EmailAlias,
    EmailForward,
    EmailAutoreply,
    Daemon,
    CronJob,
    WebrootEnvVar,
    Backup,
    TenantEgressRule,
    WireguardPeer,
}

impl ResourceKind {
    /// Children that must be deleted before a resource of this kind, per
    /// the tree's cascade rule. Not exhaustive for every leaf kind -- only
    /// kinds that act as a parent in practice need an entry.
    pub fn child_kinds(&self) -> &'static [ResourceKind] {
        use ResourceKind::*;
        match self {
            Webroot => &[Fqdn, Daemon, CronJob, WebrootEnvVar],
            Zone => &[ZoneRecord],
            Database => &[DatabaseUser, DatabaseAccessRule],
            ValkeyInstance => &[ValkeyUser],
            S3Bucket => &[S3AccessKey],
            EmailAccount => &[EmailAlias, EmailForward, EmailAutoreply],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedBy {
    Custom,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneRecordSourceType {
    Fqdn,
    EmailMx,
    EmailSpf,
    EmailDkim,
    EmailDmarc,
    ServiceHostname,
}

/// The envelope every tenant-owned resource shares. `payload` carries the
/// kind-specific fields as an opaque JSON document -- typed accessors for
/// well-known kinds live in the `payload` submodules below and in the
/// desired-state projector, which is the one place that needs to read
/// these fields back out in bulk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub tenant_id: TenantId,
    pub parent_id: Option<ResourceId>,
    pub kind: ResourceKind,
    pub payload: serde_json::Value,
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Resource {
    pub fn is_auto_managed_zone_record(&self) -> bool {
        self.kind == ResourceKind::ZoneRecord
            && self
                .payload
                .get("managed_by")
                .and_then(|v| v.as_str())
                .map(|s| s == "auto")
                .unwrap_or(false)
    }
}

pub mod payload {
    //! Typed payload shapes for the resource kinds the desired-state
    //! projector (H1) and the resource workflows (M3) need to read and
    //! write directly. Other kinds round-trip through `Resource::payload`
    //! untyped and are materialized by their activity executors.

    use super::{ManagedBy, ZoneRecordSourceType};
    use crate::ids::ResourceId;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct WebrootPayload {
        pub runtime: String,
        pub runtime_version: String,
        pub config: serde_json::Value,
        pub public_folder: String,
        pub env_file_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct WebrootEnvVarPayload {
        pub webroot_id: ResourceId,
        pub name: String,
        pub value: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FqdnPayload {
        pub webroot_id: ResourceId,
        pub hostname: String,
        pub ssl_enabled: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CertificatePayload {
        pub fqdn_id: ResourceId,
        pub issuer: String,
        pub not_after: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ZonePayload {
        pub domain: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ZoneRecordPayload {
        pub zone_id: ResourceId,
        pub record_type: String,
        pub name: String,
        pub value: String,
        pub ttl: u32,
        pub managed_by: ManagedBy,
        pub source_type: Option<ZoneRecordSourceType>,
        pub source_fqdn_id: Option<ResourceId>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatabasePayload {
        pub engine: String,
        pub name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatabaseUserPayload {
        pub database_id: ResourceId,
        pub username: String,
        /// Pre-hashed credential; the core never stores a plaintext
        /// database password (spec §9 open question, resolved in
        /// SPEC_FULL.md).
        pub credential: String,
        pub privileges: Vec<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatabaseAccessRulePayload {
        pub database_user_id: ResourceId,
        pub source_cidr: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ValkeyInstancePayload {
        pub port: u16,
        pub password: String,
        pub max_memory_mb: u32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ValkeyUserPayload {
        pub instance_id: ResourceId,
        pub username: String,
        pub credential: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct S3BucketPayload {
        pub bucket_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct S3AccessKeyPayload {
        pub bucket_id: ResourceId,
        pub access_key_id: String,
        pub secret_access_key: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SshKeyPayload {
        pub fingerprint: String,
        pub public_key: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmailAccountPayload {
        pub address: String,
        pub credential: String,
        pub quota_mb: u32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmailAliasPayload {
        pub account_id: ResourceId,
        pub alias_address: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmailForwardPayload {
        pub account_id: ResourceId,
        pub forward_to: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmailAutoreplyPayload {
        pub account_id: ResourceId,
        pub enabled: bool,
        pub message: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DaemonPayload {
        pub webroot_id: ResourceId,
        pub command: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CronJobPayload {
        pub webroot_id: ResourceId,
        pub schedule: String,
        pub command: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BackupPayload {
        pub artifact_uri: String,
        pub size_bytes: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TenantEgressRulePayload {
        pub destination_cidr: String,
        pub port: u16,
        pub protocol: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct WireguardPeerPayload {
        pub public_key: String,
        pub allowed_ips: Vec<String>,
    }
}
