//! Shared domain types for the hosting control plane.
//!
//! This crate holds no I/O and no workflow logic -- just the entities,
//! value types, and the error taxonomy that every other crate in the
//! workspace builds on.

pub mod api_key;
pub mod audit;
pub mod brand;
pub mod desired_state;
pub mod error;
pub mod health;
pub mod ids;
pub mod resource;
pub mod tenant;
pub mod topology;

pub use api_key::{hash_credential, ApiKey, Identity};
pub use audit::{classify_path, redact_body, AuditEntry, SENSITIVE_FIELDS};
pub use brand::Brand;
pub use desired_state::DesiredState;
pub use error::{ActivityError, OrchestrationError};
pub use health::{CapabilityGap, DriftEvent, Incident, IncidentEvent, NodeHealthReport};
pub use ids::{
    ApiKeyId, BrandId, ClusterId, NodeId, RegionId, ResourceId, ShardId, TenantId,
};
pub use resource::{ManagedBy, Resource, ResourceKind, ResourceStatus, ZoneRecordSourceType};
pub use tenant::{Tenant, TenantStatus};
pub use topology::{Cluster, Node, NodeLiveness, NodeShardMembership, Region, Shard, ShardRole, ShardStatus};
