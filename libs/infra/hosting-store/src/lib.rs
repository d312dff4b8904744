//! Metadata store adapter: schema bootstrap, connection management, and
//! a repository per aggregate, all speaking in `hosting_domain` types.

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::MetadataStore;
pub use errors::StoreError;
pub use repositories::{
    ApiKeyRepository, AuditRepository, BrandRepository, HealthRepository, ResourceRepository,
    TenantRepository, TopologyRepository, WorkflowRepository,
};
