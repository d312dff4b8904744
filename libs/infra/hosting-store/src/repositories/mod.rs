//! One repository per aggregate. Each wraps a `libsql::Connection` and
//! speaks only in `hosting_domain` types -- callers never see a SQL row.

pub mod api_key_repository;
pub mod audit_repository;
pub mod brand_repository;
pub mod health_repository;
pub mod resource_repository;
pub mod tenant_repository;
pub mod topology_repository;
pub mod workflow_repository;

pub use api_key_repository::ApiKeyRepository;
pub use audit_repository::AuditRepository;
pub use brand_repository::BrandRepository;
pub use health_repository::HealthRepository;
pub use resource_repository::ResourceRepository;
pub use tenant_repository::TenantRepository;
pub use topology_repository::TopologyRepository;
pub use workflow_repository::WorkflowRepository;

use crate::errors::StoreError;
use chrono::{DateTime, Utc};

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Mapping(format!("bad timestamp '{raw}': {e}")))
}

pub(crate) fn parse_json(raw: &str) -> Result<serde_json::Value, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Mapping(format!("bad json: {e}")))
}

pub(crate) fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|e| StoreError::Mapping(format!("bad enum value '{raw}': {e}")))
}

pub(crate) fn enum_to_string<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value).map_err(|e| StoreError::Mapping(e.to_string()))? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(StoreError::Mapping(format!("expected string-tagged enum, got {other}"))),
    }
}

pub(crate) fn parse_id_list<T: From<uuid::Uuid>>(raw: &str) -> Result<Vec<T>, StoreError> {
    let raw_ids: Vec<uuid::Uuid> =
        serde_json::from_str(raw).map_err(|e| StoreError::Mapping(format!("bad id list: {e}")))?;
    Ok(raw_ids.into_iter().map(T::from).collect())
}

pub(crate) fn id_list_to_json<T: std::fmt::Display>(ids: &[T]) -> String {
    let raw: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    serde_json::to_string(&raw).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn string_list_to_json(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn parse_string_list(raw: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Mapping(format!("bad string list: {e}")))
}
