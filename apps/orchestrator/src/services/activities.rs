//! L3: registers the concrete activity closures the workflow runtime can
//! invoke by name. Concrete drivers for MySQL, PowerDNS, nginx, WireGuard,
//! Stalwart, S3, Loki, Docker and Let's Encrypt are explicitly out of
//! scope here -- these activities cover the node-agent delivery surface
//! (H2/H3) and the store-level bookkeeping steps the resource sagas (M3)
//! actually need the orchestrator itself to perform.

use crate::config::Settings;
use hosting_domain::resource::payload::CertificatePayload;
use hosting_domain::{ActivityError, ResourceId, ResourceKind, ResourceStatus, TenantId, TenantStatus};
use hosting_node_client::{CronOutcome, NodeClient};
use hosting_store::MetadataStore;
use hosting_workflow::{ActivityFn, ActivityRegistry};
use serde::Deserialize;
use std::sync::Arc;

pub fn build_registry(store: MetadataStore, settings: Arc<Settings>) -> ActivityRegistry {
    let mut registry = ActivityRegistry::new();

    registry.register("node.push_desired_state", push_desired_state_activity(settings.clone()));
    registry.register("node.fetch_health", fetch_health_activity(settings.clone()));
    registry.register("node.report_cron_outcome", report_cron_outcome_activity(settings.clone()));

    registry.register("resource.update_status", update_resource_status_activity(store.clone()));
    registry.register("resource.delete_subtree", delete_resource_subtree_activity(store.clone()));
    registry.register("tenant.reserve_uid", reserve_tenant_uid_activity(store.clone()));
    registry.register("tenant.update_status", update_tenant_status_activity(store.clone()));

    registry.register("certificates.list_expiring_within", list_expiring_certificates_activity(store.clone()));
    registry.register("certificates.delete_expired", delete_expired_certificates_activity(store.clone()));
    registry.register("audit.purge_retention", purge_audit_retention_activity(store.clone(), settings.clone()));
    registry.register("backups.purge_retention", purge_backup_retention_activity(store, settings));

    registry
}

#[derive(Deserialize)]
struct PushDesiredStateArgs {
    node_hostname: String,
    desired_state: hosting_domain::DesiredState,
}

fn push_desired_state_activity(settings: Arc<Settings>) -> ActivityFn {
    Arc::new(move |args| {
        let settings = settings.clone();
        Box::pin(async move {
            let parsed: PushDesiredStateArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad push_desired_state args: {e}")))?;
            let client = NodeClient::new(&parsed.node_hostname, &settings.node_agent_shared_secret);
            client.push_desired_state(&parsed.desired_state).await?;
            Ok(serde_json::Value::Null)
        })
    })
}

#[derive(Deserialize)]
struct NodeHostnameArgs {
    node_hostname: String,
}

fn fetch_health_activity(settings: Arc<Settings>) -> ActivityFn {
    Arc::new(move |args| {
        let settings = settings.clone();
        Box::pin(async move {
            let parsed: NodeHostnameArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad fetch_health args: {e}")))?;
            let client = NodeClient::new(&parsed.node_hostname, &settings.node_agent_shared_secret);
            let report = client.fetch_health().await?;
            serde_json::to_value(report).map_err(|e| ActivityError::Terminal(format!("unencodable health report: {e}")))
        })
    })
}

#[derive(Deserialize)]
struct ReportCronOutcomeArgs {
    node_hostname: String,
    cron_job_id: String,
    outcome: CronOutcome,
}

fn report_cron_outcome_activity(settings: Arc<Settings>) -> ActivityFn {
    Arc::new(move |args| {
        let settings = settings.clone();
        Box::pin(async move {
            let parsed: ReportCronOutcomeArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad report_cron_outcome args: {e}")))?;
            let client = NodeClient::new(&parsed.node_hostname, &settings.node_agent_shared_secret);
            client.report_cron_outcome(&parsed.cron_job_id, &parsed.outcome).await?;
            Ok(serde_json::Value::Null)
        })
    })
}

#[derive(Deserialize)]
struct UpdateResourceStatusArgs {
    resource_id: ResourceId,
    status: ResourceStatus,
    status_message: Option<String>,
}

fn update_resource_status_activity(store: MetadataStore) -> ActivityFn {
    Arc::new(move |args| {
        let store = store.clone();
        Box::pin(async move {
            let parsed: UpdateResourceStatusArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad update_status args: {e}")))?;
            let repo = store.resources().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            repo.update_status(parsed.resource_id, parsed.status, parsed.status_message)
                .await
                .map_err(|e| ActivityError::Retryable(e.to_string()))?;
            Ok(serde_json::Value::Null)
        })
    })
}

#[derive(Deserialize)]
struct DeleteResourceSubtreeArgs {
    resource_id: ResourceId,
}

/// Only safe to call once every descendant's own side-effecting teardown
/// activity has already run -- this just removes the store rows.
fn delete_resource_subtree_activity(store: MetadataStore) -> ActivityFn {
    Arc::new(move |args| {
        let store = store.clone();
        Box::pin(async move {
            let parsed: DeleteResourceSubtreeArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad delete_subtree args: {e}")))?;
            let repo = store.resources().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let deleted = repo
                .delete_subtree(parsed.resource_id)
                .await
                .map_err(|e| ActivityError::Retryable(e.to_string()))?;
            Ok(serde_json::json!({ "deleted_count": deleted }))
        })
    })
}

fn reserve_tenant_uid_activity(store: MetadataStore) -> ActivityFn {
    Arc::new(move |_args| {
        let store = store.clone();
        Box::pin(async move {
            let repo = store.tenants().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let uid = repo.reserve_next_uid().await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
            Ok(serde_json::json!({ "uid": uid }))
        })
    })
}

#[derive(Deserialize)]
struct UpdateTenantStatusArgs {
    tenant_id: TenantId,
    status: TenantStatus,
    status_message: Option<String>,
}

fn update_tenant_status_activity(store: MetadataStore) -> ActivityFn {
    Arc::new(move |args| {
        let store = store.clone();
        Box::pin(async move {
            let parsed: UpdateTenantStatusArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad update_tenant_status args: {e}")))?;
            let repo = store.tenants().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            repo.update_status(parsed.tenant_id, parsed.status, parsed.status_message)
                .await
                .map_err(|e| ActivityError::Retryable(e.to_string()))?;
            Ok(serde_json::Value::Null)
        })
    })
}

#[derive(Deserialize)]
struct WithinDaysArgs {
    within_days: i64,
}

/// Returns certificate resource ids whose `not_after` falls within the
/// given window, for the cert-renewal schedule to act on. Issuing the
/// replacement certificate itself is the ACME driver's job (non-goal).
fn list_expiring_certificates_activity(store: MetadataStore) -> ActivityFn {
    Arc::new(move |args| {
        let store = store.clone();
        Box::pin(async move {
            let parsed: WithinDaysArgs = serde_json::from_value(args)
                .map_err(|e| ActivityError::Terminal(format!("bad list_expiring_within args: {e}")))?;
            let repo = store.resources().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let certificates = repo.list_by_kind(ResourceKind::Certificate).await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let cutoff = chrono::Utc::now() + chrono::Duration::days(parsed.within_days);

            let mut expiring = Vec::new();
            for cert in certificates {
                if cert.status != ResourceStatus::Active {
                    continue;
                }
                let payload: CertificatePayload = serde_json::from_value(cert.payload)
                    .map_err(|e| ActivityError::Terminal(format!("unreadable certificate payload: {e}")))?;
                if payload.not_after <= cutoff {
                    expiring.push(cert.id);
                }
            }
            Ok(serde_json::json!({ "resource_ids": expiring }))
        })
    })
}

/// Deletes certificate resources whose `not_after` has already passed.
/// The node's installed-certificate cleanup itself happens through the
/// normal convergence push once the resource is gone.
fn delete_expired_certificates_activity(store: MetadataStore) -> ActivityFn {
    Arc::new(move |_args| {
        let store = store.clone();
        Box::pin(async move {
            let repo = store.resources().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let certificates = repo.list_by_kind(ResourceKind::Certificate).await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let now = chrono::Utc::now();

            let mut deleted = 0usize;
            for cert in certificates {
                let payload: CertificatePayload = serde_json::from_value(cert.payload)
                    .map_err(|e| ActivityError::Terminal(format!("unreadable certificate payload: {e}")))?;
                if payload.not_after <= now {
                    repo.delete(cert.id).await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
                    deleted += 1;
                }
            }
            Ok(serde_json::json!({ "deleted_count": deleted }))
        })
    })
}

fn purge_audit_retention_activity(store: MetadataStore, settings: Arc<Settings>) -> ActivityFn {
    Arc::new(move |_args| {
        let store = store.clone();
        let settings = settings.clone();
        Box::pin(async move {
            let repo = store.audit().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let cutoff = chrono::Utc::now() - chrono::Duration::days(settings.audit_log_retention_days as i64);
            let purged = repo.purge_older_than(cutoff).await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
            Ok(serde_json::json!({ "purged_count": purged }))
        })
    })
}

/// Backup artifact deletion from the object store itself is the storage
/// driver's job (non-goal); this only retires the metadata row once a
/// backup resource has aged past the retention window.
fn purge_backup_retention_activity(store: MetadataStore, settings: Arc<Settings>) -> ActivityFn {
    Arc::new(move |_args| {
        let store = store.clone();
        let settings = settings.clone();
        Box::pin(async move {
            let repo = store.resources().map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let backups = repo.list_by_kind(ResourceKind::Backup).await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
            let cutoff = chrono::Utc::now() - chrono::Duration::days(settings.backup_retention_days as i64);

            let mut purged = 0usize;
            for backup in backups {
                if backup.created_at <= cutoff {
                    repo.delete(backup.id).await.map_err(|e| ActivityError::Retryable(e.to_string()))?;
                    purged += 1;
                }
            }
            Ok(serde_json::json!({ "purged_count": purged }))
        })
    })
}
