//! M2: the per-tenant serializer. Resource operations on the same tenant
//! are not independent -- an FQDN bound to a still-provisioning webroot,
//! or a delete racing a create -- but cluster-wide locking would destroy
//! throughput. Instead each tenant gets one long-lived entity workflow
//! that drains a single FIFO signal channel, starting a child workflow
//! per task and awaiting it before moving to the next (spec §4.5).

use crate::engine::WorkflowEngine;
use crate::errors::WorkflowError;
use crate::orchestration::Orchestration;
use futures::future::BoxFuture;
use hosting_domain::TenantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const WORKFLOW_KIND: &str = "tenant-provision";
pub const PROVISION_SIGNAL: &str = "provision";

/// History is truncated every this many processed tasks so a tenant that
/// stays active for years doesn't accumulate an unbounded event log.
const CONTINUE_AS_NEW_AFTER: u32 = 50;
const CONTINUE_AS_NEW_KEEP: i64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionTask {
    pub workflow_name: String,
    pub workflow_id: String,
    pub args: serde_json::Value,
    pub callback_url: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

impl ProvisionTask {
    /// Delete-shaped tasks are the only ones allowed through once a
    /// tenant has started draining.
    fn is_delete_shaped(&self) -> bool {
        self.workflow_name.starts_with("Delete")
    }
}

pub fn workflow_id_for(tenant_id: TenantId) -> String {
    format!("{WORKFLOW_KIND}-{tenant_id}")
}

/// Ensures the tenant's serializer is running (idempotent) and enqueues
/// `task` onto its FIFO. Callers never talk to the child workflow
/// directly; they go through this so ordering is preserved.
#[instrument(skip(engine, task), fields(tenant_id = %tenant_id, workflow_name = %task.workflow_name))]
pub async fn enqueue(engine: &Arc<WorkflowEngine>, tenant_id: TenantId, task: ProvisionTask) -> Result<(), WorkflowError> {
    let workflow_id = workflow_id_for(tenant_id);
    engine.clone().start(WORKFLOW_KIND, &workflow_id, serde_json::Value::Null, None).await?;
    let payload = serde_json::to_value(&task).map_err(|e| WorkflowError::Encoding(e.to_string()))?;
    engine.signal(&workflow_id, PROVISION_SIGNAL, payload).await
}

/// The serializer's workflow body, registered under [`WORKFLOW_KIND`].
/// Runs for as long as the tenant exists; it has no terminal state of its
/// own under normal operation.
pub async fn run(orchestration: Arc<Orchestration>, _args: serde_json::Value) -> Result<serde_json::Value, WorkflowError> {
    let tenant_id = parse_tenant_id(orchestration.workflow_id())?;
    let mut processed_since_compaction: u32 = 0;

    loop {
        let payload = orchestration.await_signal(PROVISION_SIGNAL).await?;
        let task: ProvisionTask = match serde_json::from_value(payload) {
            Ok(task) => task,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "dropping malformed provision task");
                continue;
            }
        };

        if is_draining(&orchestration, tenant_id).await && !task.is_delete_shaped() {
            warn!(
                tenant_id = %tenant_id,
                workflow_name = %task.workflow_name,
                "tenant is draining: rejecting non-delete task"
            );
            continue;
        }

        match orchestration.start_child(&task.workflow_name, &task.workflow_id, task.args.clone()).await {
            Ok(_) => info!(tenant_id = %tenant_id, child = %task.workflow_id, "provision task completed"),
            Err(e) => {
                // The child workflow itself is responsible for writing
                // the resource's terminal status; the serializer only
                // logs and moves on so one failed task never blocks the
                // rest of the tenant's queue.
                warn!(tenant_id = %tenant_id, child = %task.workflow_id, error = %e, "provision task failed");
            }
        }

        processed_since_compaction += 1;
        if processed_since_compaction >= CONTINUE_AS_NEW_AFTER {
            orchestration.compact_history(CONTINUE_AS_NEW_KEEP).await?;
            processed_since_compaction = 0;
        }
    }
}

/// Adapter for [`WorkflowEngine::register_workflow`], which needs a plain
/// `Fn` returning a boxed future rather than an `async fn` item.
pub fn run_boxed(
    orchestration: Arc<Orchestration>,
    args: serde_json::Value,
) -> BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(run(orchestration, args))
}

async fn is_draining(orchestration: &Orchestration, tenant_id: TenantId) -> bool {
    match orchestration.store().tenants() {
        Ok(repo) => match repo.get(tenant_id).await {
            Ok(tenant) => !tenant.status.accepts_new_non_delete_work(),
            Err(_) => false,
        },
        Err(_) => false,
    }
}

fn parse_tenant_id(workflow_id: &str) -> Result<TenantId, WorkflowError> {
    let raw = workflow_id
        .strip_prefix(&format!("{WORKFLOW_KIND}-"))
        .ok_or_else(|| WorkflowError::UnknownWorkflowKind(workflow_id.to_string()))?;
    uuid::Uuid::parse_str(raw)
        .map(TenantId::from)
        .map_err(|_| WorkflowError::UnknownWorkflowKind(workflow_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_id_round_trips() {
        let tenant_id = TenantId::new();
        let workflow_id = workflow_id_for(tenant_id);
        assert_eq!(parse_tenant_id(&workflow_id).unwrap(), tenant_id);
    }

    #[test]
    fn delete_shaped_detection() {
        let task = ProvisionTask {
            workflow_name: "DeleteWebrootWorkflow".to_string(),
            workflow_id: "wf-1".to_string(),
            args: serde_json::Value::Null,
            callback_url: None,
            resource_type: None,
            resource_id: None,
        };
        assert!(task.is_delete_shaped());

        let task = ProvisionTask { workflow_name: "CreateWebrootWorkflow".to_string(), ..task };
        assert!(!task.is_delete_shaped());
    }
}
