//! H3: ingests node-agent self-reports, overwriting the one health row
//! per node (not append-only, spec §4.9), maintains the per-node drift
//! ring, and runs the background liveness sweep that marks a node
//! unhealthy once it falls silent past the configured window.

use hosting_domain::{AuditEntry, DriftEvent, NodeHealthReport, NodeId, NodeLiveness};
use hosting_store::{MetadataStore, StoreError};
use std::time::Duration;
use tracing::{info, warn};

/// Node agents report on roughly this cadence; the liveness window is a
/// multiple of it (`Settings::liveness_window_multiplier`).
const ASSUMED_REPORT_INTERVAL_SECS: i64 = 60;
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Records a self-report, flips liveness back to healthy if the node had
/// previously been marked unhealthy, and appends any drift events the
/// report carried.
pub async fn ingest_report(
    store: &MetadataStore,
    node_id: NodeId,
    report: NodeHealthReport,
    drift_events: Vec<DriftEvent>,
) -> Result<(), StoreError> {
    let health_repo = store.health()?;
    health_repo.upsert_health(&report).await?;

    for event in drift_events {
        health_repo.append_drift(&event).await?;
    }

    let topology_repo = store.topology()?;
    if let Ok(node) = topology_repo.get_node(node_id).await {
        if node.liveness != NodeLiveness::Healthy {
            topology_repo.set_node_liveness(node_id, NodeLiveness::Healthy).await?;
            record_liveness_transition(store, node_id, NodeLiveness::Healthy).await;
        }
    }

    Ok(())
}

async fn record_liveness_transition(store: &MetadataStore, node_id: NodeId, new_liveness: NodeLiveness) {
    let Ok(audit_repo) = store.audit() else { return };
    let entry = AuditEntry {
        api_key_id: None,
        method: "INTERNAL".to_string(),
        path: format!("/internal/v1/nodes/{node_id}/liveness"),
        resource_type: Some("node".to_string()),
        resource_id: Some(node_id.to_string()),
        status_code: 200,
        redacted_body: serde_json::json!({ "liveness": new_liveness }),
        created_at: chrono::Utc::now(),
    };
    if let Err(e) = audit_repo.insert(&entry).await {
        warn!(node_id = %node_id, error = %e, "failed to audit liveness transition");
    }
}

/// Background loop: every `SWEEP_INTERVAL`, marks any node whose last
/// health report is older than the liveness window as unhealthy.
pub async fn run_liveness_sweep_loop(store: MetadataStore, liveness_window_multiplier: u32) {
    let window = Duration::from_secs(ASSUMED_REPORT_INTERVAL_SECS as u64 * liveness_window_multiplier as u64);
    loop {
        tokio::time::sleep(SWEEP_INTERVAL).await;
        if let Err(e) = sweep_once(&store, window).await {
            warn!(error = %e, "liveness sweep failed");
        }
    }
}

async fn sweep_once(store: &MetadataStore, window: Duration) -> Result<(), StoreError> {
    let cutoff = chrono::Utc::now() - chrono::Duration::from_std(window).unwrap_or(chrono::Duration::seconds(ASSUMED_REPORT_INTERVAL_SECS * 3));
    let topology_repo = store.topology()?;
    let stale = topology_repo.list_stale_nodes(cutoff).await?;

    for node in stale {
        if node.liveness == NodeLiveness::Unhealthy {
            continue;
        }
        topology_repo.set_node_liveness(node.id, NodeLiveness::Unhealthy).await?;
        info!(node_id = %node.id, "node marked unhealthy: no report within liveness window");
        record_liveness_transition(store, node.id, NodeLiveness::Unhealthy).await;
    }
    Ok(())
}
