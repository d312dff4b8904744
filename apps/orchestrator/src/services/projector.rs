//! H1: projects the current metadata-store snapshot into the per-node
//! `DesiredState` a node agent should converge toward (spec §4.7).
//!
//! `project` is deterministic given its inputs: every list is sorted by
//! a stable key before it is returned, so two calls against an unchanged
//! store produce byte-identical output. `dns`-role shards are not
//! projected here; zone/record state reaches dns nodes through a
//! separate side channel this crate does not implement.

use hosting_domain::desired_state::{
    DatabaseAccessRuleEntry, DatabaseEntry, DatabaseUserEntry, LbMapping, StorageBucketEntry,
    ValkeyInstanceEntry, ValkeyUserEntry, WebCronJob, WebDaemon, WebEnvVar, WebFqdn, WebTenant,
    WebWebroot,
};
use hosting_domain::resource::payload;
use hosting_domain::{Cluster, DesiredState, Node, ResourceKind, ResourceStatus, Shard, ShardRole};
use hosting_store::{MetadataStore, StoreError};

/// Builds the desired state for `node`, which participates in `shard`
/// (itself belonging to `cluster`). Returns `None` for shard roles that
/// are not projected (currently only `dns`).
pub async fn project(
    store: &MetadataStore,
    node: &Node,
    shard: &Shard,
    cluster: &Cluster,
) -> Result<Option<DesiredState>, StoreError> {
    match shard.role {
        ShardRole::Web => Ok(Some(project_web(store, node, shard).await?)),
        ShardRole::Database => Ok(Some(project_database(store, node, cluster).await?)),
        ShardRole::Valkey => Ok(Some(project_valkey(store, node, cluster).await?)),
        ShardRole::Lb => Ok(Some(project_lb(store, node, cluster).await?)),
        ShardRole::Storage => Ok(Some(project_storage(store, node, cluster).await?)),
        ShardRole::Dns | ShardRole::Email | ShardRole::Dbadmin | ShardRole::Gateway => Ok(None),
    }
}

async fn project_web(store: &MetadataStore, node: &Node, shard: &Shard) -> Result<DesiredState, StoreError> {
    let tenants_repo = store.tenants()?;
    let resources_repo = store.resources()?;

    let mut web_tenants = Vec::new();
    for tenant in tenants_repo.list_by_shard(shard.id).await? {
        let mut webroots = Vec::new();
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::Webroot)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::WebrootPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            let mut env_vars = Vec::new();
            for e in resources_repo.list_by_parent(r.id).await? {
                if e.kind != ResourceKind::WebrootEnvVar {
                    continue;
                }
                let ev: payload::WebrootEnvVarPayload = serde_json::from_value(e.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
                env_vars.push(WebEnvVar { name: ev.name, value: ev.value });
            }
            env_vars.sort_by(|a, b| a.name.cmp(&b.name));
            webroots.push(WebWebroot {
                id: r.id,
                runtime: p.runtime,
                runtime_version: p.runtime_version,
                config: p.config,
                env_vars,
                public_folder: p.public_folder,
                env_file_name: p.env_file_name,
            });
        }
        webroots.sort_by_key(|w| w.id);

        let mut fqdns = Vec::new();
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::Fqdn)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::FqdnPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            fqdns.push(WebFqdn { id: r.id, hostname: p.hostname, ssl_enabled: p.ssl_enabled });
        }
        fqdns.sort_by_key(|f| f.id);

        let mut cron_jobs = Vec::new();
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::CronJob)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::CronJobPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            cron_jobs.push(WebCronJob { id: r.id, schedule: p.schedule, command: p.command });
        }
        cron_jobs.sort_by_key(|c| c.id);

        let mut daemons = Vec::new();
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::Daemon)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::DaemonPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            daemons.push(WebDaemon { id: r.id, command: p.command });
        }
        daemons.sort_by_key(|d| d.id);

        let mut ssh_key_fingerprints = Vec::new();
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::SshKey)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::SshKeyPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            ssh_key_fingerprints.push(p.fingerprint);
        }
        ssh_key_fingerprints.sort();

        web_tenants.push(WebTenant {
            id: tenant.id,
            uid: tenant.uid,
            sftp_enabled: tenant.sftp_enabled,
            ssh_enabled: tenant.ssh_enabled,
            webroots,
            fqdns,
            cron_jobs,
            daemons,
            ssh_key_fingerprints,
        });
    }
    web_tenants.sort_by_key(|t| t.id);

    Ok(DesiredState::Web { node_id: node.id, tenants: web_tenants })
}

/// Resources tied to non-`web` roles are addressed by cluster rather
/// than by a direct shard foreign key, since a tenant only carries a
/// pinned `web` shard (spec §3). Every tenant in the node's cluster is a
/// candidate; resources that don't exist for that tenant simply yield
/// an empty list.
async fn tenants_in_cluster(store: &MetadataStore, cluster: &Cluster) -> Result<Vec<hosting_domain::Tenant>, StoreError> {
    let tenants_repo = store.tenants()?;
    let mut all = tenants_repo.list(None).await?;
    all.retain(|t| t.cluster_id == cluster.id);
    Ok(all)
}

async fn project_database(store: &MetadataStore, node: &Node, cluster: &Cluster) -> Result<DesiredState, StoreError> {
    let resources_repo = store.resources()?;
    let mut databases = Vec::new();
    for tenant in tenants_in_cluster(store, cluster).await? {
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::Database)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::DatabasePayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            let mut users = Vec::new();
            let mut access_rules = Vec::new();
            for child in resources_repo.list_by_parent(r.id).await? {
                match child.kind {
                    ResourceKind::DatabaseUser => {
                        let up: payload::DatabaseUserPayload = serde_json::from_value(child.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
                        users.push(DatabaseUserEntry { id: child.id, username: up.username, credential: up.credential, privileges: up.privileges });
                    }
                    ResourceKind::DatabaseAccessRule => {
                        let ap: payload::DatabaseAccessRulePayload = serde_json::from_value(child.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
                        access_rules.push(DatabaseAccessRuleEntry { database_user_id: ap.database_user_id, source_cidr: ap.source_cidr });
                    }
                    _ => {}
                }
            }
            users.sort_by_key(|u| u.id);
            access_rules.sort_by(|a, b| (a.database_user_id, &a.source_cidr).cmp(&(b.database_user_id, &b.source_cidr)));
            databases.push(DatabaseEntry { id: r.id, tenant_id: tenant.id, engine: p.engine, name: p.name, users, access_rules });
        }
    }
    databases.sort_by_key(|d| d.id);
    Ok(DesiredState::Database { node_id: node.id, databases })
}

async fn project_valkey(store: &MetadataStore, node: &Node, cluster: &Cluster) -> Result<DesiredState, StoreError> {
    let resources_repo = store.resources()?;
    let mut instances = Vec::new();
    for tenant in tenants_in_cluster(store, cluster).await? {
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::ValkeyInstance)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::ValkeyInstancePayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            let mut users = Vec::new();
            for child in resources_repo.list_by_parent(r.id).await? {
                if child.kind != ResourceKind::ValkeyUser {
                    continue;
                }
                let up: payload::ValkeyUserPayload = serde_json::from_value(child.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
                users.push(ValkeyUserEntry { id: child.id, username: up.username, credential: up.credential });
            }
            users.sort_by_key(|u| u.id);
            instances.push(ValkeyInstanceEntry { id: r.id, tenant_id: tenant.id, port: p.port, password: p.password, max_memory_mb: p.max_memory_mb, users });
        }
    }
    instances.sort_by_key(|i| i.id);
    Ok(DesiredState::Valkey { node_id: node.id, instances })
}

/// Backends are addressed by the tenant's stable uid rather than a raw
/// node hostname, since a web tenant may move between web nodes on
/// re-convergence without changing what the lb routes to.
async fn project_lb(store: &MetadataStore, node: &Node, cluster: &Cluster) -> Result<DesiredState, StoreError> {
    let resources_repo = store.resources()?;
    let mut mappings = Vec::new();
    for tenant in tenants_in_cluster(store, cluster).await? {
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::Fqdn)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::FqdnPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            mappings.push(LbMapping { fqdn: p.hostname, backend: format!("tenant-{}.internal", tenant.uid) });
        }
    }
    mappings.sort_by(|a, b| (&a.fqdn, &a.backend).cmp(&(&b.fqdn, &b.backend)));
    Ok(DesiredState::Lb { node_id: node.id, mappings })
}

async fn project_storage(store: &MetadataStore, node: &Node, cluster: &Cluster) -> Result<DesiredState, StoreError> {
    let resources_repo = store.resources()?;
    let mut buckets = Vec::new();
    for tenant in tenants_in_cluster(store, cluster).await? {
        for r in resources_repo.list_by_tenant(tenant.id, Some(ResourceKind::S3Bucket)).await? {
            if r.status != ResourceStatus::Active {
                continue;
            }
            let p: payload::S3BucketPayload = serde_json::from_value(r.payload.clone()).map_err(|e| StoreError::Mapping(e.to_string()))?;
            buckets.push(StorageBucketEntry { bucket: p.bucket_name, tenant_id: tenant.id });
        }
    }
    buckets.sort_by(|a, b| (a.tenant_id, &a.bucket).cmp(&(b.tenant_id, &b.bucket)));
    Ok(DesiredState::Storage { node_id: node.id, buckets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lb_mapping_sort_is_deterministic() {
        let mut mappings = vec![
            LbMapping { fqdn: "b.example.com".into(), backend: "tenant-2.internal".into() },
            LbMapping { fqdn: "a.example.com".into(), backend: "tenant-1.internal".into() },
        ];
        mappings.sort_by(|a, b| (&a.fqdn, &a.backend).cmp(&(&b.fqdn, &b.backend)));
        assert_eq!(mappings[0].fqdn, "a.example.com");
    }

    proptest! {
        /// The sort step every `project_*` helper applies before handing a
        /// list to the caller must be order-independent: shuffling the
        /// input and sorting again always lands on the same sequence.
        #[test]
        fn lb_mapping_sort_is_independent_of_input_order(
            fqdns in prop::collection::vec("[a-z]{1,8}", 0..8),
        ) {
            let mut mappings: Vec<LbMapping> = fqdns
                .into_iter()
                .enumerate()
                .map(|(i, fqdn)| LbMapping { fqdn, backend: format!("tenant-{i}.internal") })
                .collect();

            let mut forward = mappings.clone();
            forward.sort_by(|a, b| (&a.fqdn, &a.backend).cmp(&(&b.fqdn, &b.backend)));

            mappings.reverse();
            let mut backward = mappings;
            backward.sort_by(|a, b| (&a.fqdn, &a.backend).cmp(&(&b.fqdn, &b.backend)));

            prop_assert_eq!(forward, backward);
        }
    }
}
