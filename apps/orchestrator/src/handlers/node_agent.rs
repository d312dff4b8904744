//! The internal node-agent surface (spec §6.2): the four endpoints a node
//! agent itself calls, as opposed to `services::activities`' outbound
//! `NodeClient`, which the orchestrator uses to push state the other way.
//! Both directions exist side by side -- convergence pushes proactively,
//! but a node agent that missed a push (or just rebooted) can still pull
//! its own desired state here.

use crate::error::ApiResult;
use crate::services::health_ingest;
use crate::services::projector;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hosting_domain::{AuditEntry, DesiredState, DriftEvent, NodeHealthReport, NodeId, ResourceId};
use hosting_node_client::CronOutcome;
use serde::Deserialize;

pub async fn get_desired_state(State(state): State<AppState>, Path(node_id): Path<NodeId>) -> ApiResult<Json<Vec<DesiredState>>> {
    let topology_repo = state.store.topology()?;
    let brand_repo = state.store.brands()?;

    let memberships = topology_repo.list_memberships_by_node(node_id).await?;
    let node = topology_repo.get_node(node_id).await?;

    let mut states = Vec::new();
    for membership in memberships {
        let shard = topology_repo.get_shard(membership.shard_id).await?;
        let cluster = brand_repo.get_cluster(shard.cluster_id).await?;
        if let Some(desired) = projector::project(&state.store, &node, &shard, &cluster).await? {
            states.push(desired);
        }
    }
    Ok(Json(states))
}

#[derive(Deserialize)]
pub struct HealthReportBody {
    pub report: NodeHealthReport,
    #[serde(default)]
    pub drift_events: Vec<DriftEvent>,
}

pub async fn post_health(
    State(state): State<AppState>,
    Path(node_id): Path<NodeId>,
    Json(body): Json<HealthReportBody>,
) -> ApiResult<StatusCode> {
    health_ingest::ingest_report(&state.store, node_id, body.report, body.drift_events).await?;
    Ok(StatusCode::OK)
}

pub async fn post_drift_events(
    State(state): State<AppState>,
    Path(node_id): Path<NodeId>,
    Json(events): Json<Vec<DriftEvent>>,
) -> ApiResult<StatusCode> {
    let health_repo = state.store.health()?;
    for event in events {
        if event.node_id != node_id {
            continue;
        }
        health_repo.append_drift(&event).await?;
    }
    Ok(StatusCode::OK)
}

/// Batch cron-job outcome report (spec §9 open question, resolved in
/// favor of the batch form over one call per run). The most recent
/// outcome becomes the cron-job resource's `status_message`; every
/// outcome in the batch is also written to the audit log.
pub async fn post_cron_outcome(
    State(state): State<AppState>,
    Path(cron_job_id): Path<ResourceId>,
    Json(outcomes): Json<Vec<CronOutcome>>,
) -> ApiResult<StatusCode> {
    let resources_repo = state.store.resources()?;
    let audit_repo = state.store.audit()?;

    let mut latest: Option<&CronOutcome> = None;
    for outcome in &outcomes {
        if latest.map(|l| outcome.ran_at > l.ran_at).unwrap_or(true) {
            latest = Some(outcome);
        }
        let entry = AuditEntry {
            api_key_id: None,
            method: "INTERNAL".to_string(),
            path: format!("/internal/v1/cron-jobs/{cron_job_id}/outcome"),
            resource_type: Some("cron_job".to_string()),
            resource_id: Some(cron_job_id.to_string()),
            status_code: 200,
            redacted_body: serde_json::to_value(outcome).unwrap_or_default(),
            created_at: outcome.ran_at,
        };
        audit_repo.insert(&entry).await?;
    }

    if let Some(outcome) = latest {
        let message = match &outcome.detail {
            Some(detail) => format!("{}: {detail}", if outcome.succeeded { "ok" } else { "failed" }),
            None => if outcome.succeeded { "ok".to_string() } else { "failed".to_string() },
        };
        let resource = resources_repo.get(cron_job_id).await?;
        resources_repo.update_status(cron_job_id, resource.status, Some(message)).await?;
    }

    Ok(StatusCode::OK)
}
