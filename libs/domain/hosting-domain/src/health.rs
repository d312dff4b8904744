//! Health/drift ingest domain types (H3) and the incident-observability
//! records named in spec §3.1 as "out of scope for core mechanics beyond
//! a resource type with a status field".

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub ok: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub drift_detected: bool,
    pub notes: Option<String>,
}

/// The latest health row for a node -- overwritten on every report, not
/// append-only (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHealthReport {
    pub node_id: NodeId,
    pub status: String,
    pub checks: Vec<HealthCheck>,
    pub reconciliation: Option<ReconciliationSummary>,
    pub reported_at: chrono::DateTime<chrono::Utc>,
}

/// Appended to a per-node ring, capped at `DriftEvent::RING_CAPACITY`
/// with FIFO eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEvent {
    pub node_id: NodeId,
    pub summary: String,
    pub detail: serde_json::Value,
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

impl DriftEvent {
    pub const RING_CAPACITY: usize = 10_000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: uuid::Uuid,
    pub title: String,
    pub status: IncidentStatus,
    pub opened_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub incident_id: uuid::Uuid,
    pub message: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityGap {
    pub id: uuid::Uuid,
    pub description: String,
    pub status: IncidentStatus,
}
