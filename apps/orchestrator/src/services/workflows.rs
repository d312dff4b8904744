//! M3: resource workflows, registered alongside the M2 per-tenant
//! serializer under the same `WorkflowEngine`. Every resource kind shares
//! the same create/delete skeleton (spec §4.6): pending -> provisioning
//! -> active, or deleting -> gone, with a failure compensating back to a
//! terminal status rather than leaving a half-applied resource behind.
//!
//! Concrete driver work (the actual MySQL grant, nginx vhost, DNS record,
//! etc.) is out of scope (spec §1); these workflows run the bookkeeping
//! steps the core itself owns and leave the hook where a driver activity
//! would be invoked clearly marked.

use hosting_domain::{ResourceId, ResourceKind, ResourceStatus, TenantId, TenantStatus};
use hosting_store::MetadataStore;
use hosting_workflow::{Orchestration, WorkflowEngine, WorkflowError};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

const RESOURCE_KINDS: &[ResourceKind] = &[
    ResourceKind::Webroot,
    ResourceKind::Fqdn,
    ResourceKind::Certificate,
    ResourceKind::Zone,
    ResourceKind::ZoneRecord,
    ResourceKind::Database,
    ResourceKind::DatabaseUser,
    ResourceKind::DatabaseAccessRule,
    ResourceKind::ValkeyInstance,
    ResourceKind::ValkeyUser,
    ResourceKind::S3Bucket,
    ResourceKind::S3AccessKey,
    ResourceKind::SshKey,
    ResourceKind::EmailAccount,
    ResourceKind::EmailAlias,
    ResourceKind::EmailForward,
    ResourceKind::EmailAutoreply,
    ResourceKind::Daemon,
    ResourceKind::CronJob,
    ResourceKind::WebrootEnvVar,
    ResourceKind::Backup,
    ResourceKind::TenantEgressRule,
    ResourceKind::WireguardPeer,
];

pub fn create_workflow_name(kind: ResourceKind) -> String {
    format!("Create{kind:?}Workflow")
}

pub fn delete_workflow_name(kind: ResourceKind) -> String {
    format!("Delete{kind:?}Workflow")
}

/// Registers the serializer, every per-kind resource workflow, the
/// tenant-level create/delete workflows, and the four H4 scheduled jobs.
pub fn register(engine: &Arc<WorkflowEngine>, store: MetadataStore) {
    engine.register_workflow(hosting_workflow::serializer::WORKFLOW_KIND, Arc::new(hosting_workflow::serializer::run_boxed));

    for &kind in RESOURCE_KINDS {
        engine.register_workflow(create_workflow_name(kind), Arc::new(create_resource_workflow));
        engine.register_workflow(delete_workflow_name(kind), Arc::new(delete_resource_workflow));
    }

    engine.register_workflow("CreateTenantWorkflow", Arc::new(create_tenant_workflow));

    let delete_tenant_store = store.clone();
    engine.register_workflow(
        "DeleteTenantWorkflow",
        Arc::new(move |orchestration, args| Box::pin(delete_tenant_workflow(delete_tenant_store.clone(), orchestration, args))),
    );

    engine.register_workflow("RenewLECertWorkflow", Arc::new(renew_le_cert_workflow));
    engine.register_workflow("CleanupExpiredCertsWorkflow", Arc::new(cleanup_expired_certs_workflow));
    engine.register_workflow("AuditLogRetentionWorkflow", Arc::new(audit_log_retention_workflow));
    engine.register_workflow("BackupRetentionWorkflow", Arc::new(backup_retention_workflow));
}

#[derive(serde::Deserialize)]
struct ResourceArgs {
    resource_id: ResourceId,
}

fn create_resource_workflow(
    orchestration: Arc<Orchestration>,
    args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move {
        let parsed: ResourceArgs = serde_json::from_value(args).map_err(|e| WorkflowError::Encoding(e.to_string()))?;

        orchestration
            .run_activity("resource.update_status", json!({ "resource_id": parsed.resource_id, "status": ResourceStatus::Provisioning, "status_message": None::<String> }))
            .await?;

        // The concrete driver call (create the vhost, the grant, the
        // zone record, ...) would run here; none is wired in since every
        // driver is out of scope for this core.
        let outcome = orchestration
            .run_activity("resource.update_status", json!({ "resource_id": parsed.resource_id, "status": ResourceStatus::Active, "status_message": None::<String> }))
            .await;

        match outcome {
            Ok(_) => Ok(json!({ "resource_id": parsed.resource_id, "status": "active" })),
            Err(e) => {
                let message = e.to_string();
                orchestration
                    .run_activity("resource.update_status", json!({ "resource_id": parsed.resource_id, "status": ResourceStatus::Failed, "status_message": message }))
                    .await
                    .ok();
                Err(e)
            }
        }
    })
}

fn delete_resource_workflow(
    orchestration: Arc<Orchestration>,
    args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move {
        let parsed: ResourceArgs = serde_json::from_value(args).map_err(|e| WorkflowError::Encoding(e.to_string()))?;

        orchestration
            .run_activity("resource.update_status", json!({ "resource_id": parsed.resource_id, "status": ResourceStatus::Deleting, "status_message": None::<String> }))
            .await?;

        let result = orchestration.run_activity("resource.delete_subtree", json!({ "resource_id": parsed.resource_id })).await?;
        Ok(json!({ "resource_id": parsed.resource_id, "deleted": true, "subtree": result }))
    })
}

#[derive(serde::Deserialize)]
struct TenantArgs {
    tenant_id: TenantId,
}

fn create_tenant_workflow(
    orchestration: Arc<Orchestration>,
    args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move {
        let parsed: TenantArgs = serde_json::from_value(args).map_err(|e| WorkflowError::Encoding(e.to_string()))?;

        orchestration
            .run_activity("tenant.update_status", json!({ "tenant_id": parsed.tenant_id, "status": TenantStatus::Provisioning, "status_message": None::<String> }))
            .await?;

        let outcome = orchestration
            .run_activity("tenant.update_status", json!({ "tenant_id": parsed.tenant_id, "status": TenantStatus::Active, "status_message": None::<String> }))
            .await;

        match outcome {
            Ok(_) => Ok(json!({ "tenant_id": parsed.tenant_id, "status": "active" })),
            Err(e) => {
                let message = e.to_string();
                orchestration
                    .run_activity("tenant.update_status", json!({ "tenant_id": parsed.tenant_id, "status": TenantStatus::Failed, "status_message": message }))
                    .await
                    .ok();
                Err(e)
            }
        }
    })
}

/// Every root-level resource (no parent) is torn down -- which recurses
/// through its own descendants via `resource.delete_subtree` -- before
/// the tenant itself is marked deleted, so no resource can outlive its
/// owning tenant (spec §8 scenario 6).
async fn delete_tenant_workflow(
    store: MetadataStore,
    orchestration: Arc<Orchestration>,
    args: serde_json::Value,
) -> Result<serde_json::Value, WorkflowError> {
    let parsed: TenantArgs = serde_json::from_value(args).map_err(|e| WorkflowError::Encoding(e.to_string()))?;

    orchestration
        .run_activity("tenant.update_status", json!({ "tenant_id": parsed.tenant_id, "status": TenantStatus::Deleting, "status_message": None::<String> }))
        .await?;

    let resources_repo = store.resources()?;
    let roots: Vec<_> = resources_repo
        .list_by_tenant(parsed.tenant_id, None)
        .await?
        .into_iter()
        .filter(|r| r.parent_id.is_none())
        .collect();

    for root in roots {
        let child_workflow_id = format!("resource-delete-{}", root.id);
        orchestration
            .start_child(&delete_workflow_name(root.kind), &child_workflow_id, json!({ "resource_id": root.id }))
            .await?;
    }

    orchestration
        .run_activity("tenant.update_status", json!({ "tenant_id": parsed.tenant_id, "status": TenantStatus::Deleted, "status_message": None::<String> }))
        .await?;

    Ok(json!({ "tenant_id": parsed.tenant_id, "status": "deleted" }))
}

const CERT_RENEWAL_WINDOW_DAYS: i64 = 21;

fn renew_le_cert_workflow(
    orchestration: Arc<Orchestration>,
    _args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move {
        let result = orchestration
            .run_activity("certificates.list_expiring_within", json!({ "within_days": CERT_RENEWAL_WINDOW_DAYS }))
            .await?;
        let resource_ids = result.get("resource_ids").cloned().unwrap_or(serde_json::Value::Array(vec![]));
        if let Some(ids) = resource_ids.as_array() {
            if !ids.is_empty() {
                warn!(count = ids.len(), "certificates approaching expiry, issuance driver not wired in this core");
            }
        }
        Ok(result)
    })
}

fn cleanup_expired_certs_workflow(
    orchestration: Arc<Orchestration>,
    _args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move { orchestration.run_activity("certificates.delete_expired", serde_json::Value::Null).await })
}

fn audit_log_retention_workflow(
    orchestration: Arc<Orchestration>,
    _args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move { orchestration.run_activity("audit.purge_retention", serde_json::Value::Null).await })
}

fn backup_retention_workflow(
    orchestration: Arc<Orchestration>,
    _args: serde_json::Value,
) -> futures::future::BoxFuture<'static, Result<serde_json::Value, WorkflowError>> {
    Box::pin(async move { orchestration.run_activity("backups.purge_retention", serde_json::Value::Null).await })
}
