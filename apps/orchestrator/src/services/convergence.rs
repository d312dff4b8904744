//! H2: the convergence loop. `ConvergeShardWorkflow` loads every node
//! membership for a shard in `shard_index` order, projects each node's
//! desired state (H1), and pushes it with bounded fan-out (spec §4.8).
//! The workflow id is `converge-shard-<shard_id>`, so triggering
//! convergence for a shard that is already converging is a no-op start
//! rather than a second concurrent run.

use crate::services::projector;
use futures::stream::{self, StreamExt};
use hosting_domain::{ShardId, ShardStatus};
use hosting_store::MetadataStore;
use hosting_workflow::{Orchestration, WorkflowEngine, WorkflowError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How often a shard re-converges on its own even with no explicit
/// trigger (spec §4.8's "5-min timer default").
const DEFAULT_RECONVERGE_INTERVAL: Duration = Duration::from_secs(300);

pub fn workflow_id_for(shard_id: ShardId) -> String {
    format!("converge-shard-{shard_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConvergeArgs {
    shard_id: ShardId,
    fanout: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeConvergenceOutcome {
    node_id: String,
    ok: bool,
    error: Option<String>,
}

/// Starts (idempotently) the periodic convergence workflow for `shard_id`.
pub async fn trigger(engine: &Arc<WorkflowEngine>, shard_id: ShardId, fanout: usize) -> Result<(), WorkflowError> {
    let workflow_id = workflow_id_for(shard_id);
    let args = serde_json::to_value(ConvergeArgs { shard_id, fanout }).map_err(|e| WorkflowError::Encoding(e.to_string()))?;
    engine.clone().start("ConvergeShardWorkflow", &workflow_id, args, None).await
}

pub fn register(engine: &Arc<WorkflowEngine>, store: MetadataStore) {
    let store_for_workflow = store.clone();
    engine.register_workflow(
        "ConvergeShardWorkflow",
        Arc::new(move |orchestration, args| Box::pin(converge_shard_workflow(store_for_workflow.clone(), orchestration, args))),
    );
}

/// Re-triggers every active shard's convergence workflow once per sweep
/// interval, so a shard with no explicit trigger and no desired-state
/// change still periodically reconfirms its nodes are converged.
pub async fn run_periodic_reconverge_loop(engine: Arc<WorkflowEngine>, store: MetadataStore, fanout: usize) {
    loop {
        tokio::time::sleep(DEFAULT_RECONVERGE_INTERVAL).await;
        if let Err(e) = reconverge_all_shards(&engine, &store, fanout).await {
            warn!(error = %e, "periodic reconvergence sweep failed");
        }
    }
}

async fn reconverge_all_shards(engine: &Arc<WorkflowEngine>, store: &MetadataStore, fanout: usize) -> Result<(), hosting_store::StoreError> {
    let brand_repo = store.brands()?;
    let topology_repo = store.topology()?;

    for region in brand_repo.list_regions().await? {
        for cluster in brand_repo.list_clusters_by_region(region.id).await? {
            for role in [
                hosting_domain::ShardRole::Web,
                hosting_domain::ShardRole::Database,
                hosting_domain::ShardRole::Valkey,
                hosting_domain::ShardRole::Lb,
                hosting_domain::ShardRole::Storage,
            ] {
                for shard in topology_repo.list_shards_by_role(cluster.id, role).await? {
                    if shard.status != ShardStatus::Active {
                        continue;
                    }
                    if let Err(e) = trigger(engine, shard.id, fanout).await {
                        warn!(shard_id = %shard.id, error = %e, "failed to re-trigger shard convergence");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn converge_shard_workflow(
    store: MetadataStore,
    orchestration: Arc<Orchestration>,
    args: serde_json::Value,
) -> Result<serde_json::Value, WorkflowError> {
    let parsed: ConvergeArgs = serde_json::from_value(args).map_err(|e| WorkflowError::Encoding(e.to_string()))?;

    let topology_repo = store.topology()?;
    let brand_repo = store.brands()?;

    let shard = topology_repo.get_shard(parsed.shard_id).await?;
    let cluster = brand_repo.get_cluster(shard.cluster_id).await?;
    let memberships = topology_repo.list_memberships_by_shard(parsed.shard_id).await?;

    let fanout = parsed.fanout.max(1);

    let outcomes: Vec<NodeConvergenceOutcome> = stream::iter(memberships.into_iter())
        .map(|membership| {
            let topology_repo_owned = &topology_repo;
            let shard = &shard;
            let cluster = &cluster;
            let store = &store;
            let orchestration = &orchestration;
            async move {
                let node = match topology_repo_owned.get_node(membership.node_id).await {
                    Ok(node) => node,
                    Err(e) => {
                        return NodeConvergenceOutcome { node_id: membership.node_id.to_string(), ok: false, error: Some(e.to_string()) };
                    }
                };

                let desired = match projector::project(store, &node, shard, cluster).await {
                    Ok(Some(desired)) => desired,
                    Ok(None) => return NodeConvergenceOutcome { node_id: node.id.to_string(), ok: true, error: None },
                    Err(e) => return NodeConvergenceOutcome { node_id: node.id.to_string(), ok: false, error: Some(e.to_string()) },
                };

                let push_args = json!({ "node_hostname": node.hostname, "desired_state": desired });
                match orchestration.run_activity("node.push_desired_state", push_args).await {
                    Ok(_) => NodeConvergenceOutcome { node_id: node.id.to_string(), ok: true, error: None },
                    Err(e) => NodeConvergenceOutcome { node_id: node.id.to_string(), ok: false, error: Some(e.to_string()) },
                }
            }
        })
        .buffer_unordered(fanout)
        .collect()
        .await;

    let all_ok = outcomes.iter().all(|o| o.ok);
    let (new_status, status_message) = if all_ok {
        (ShardStatus::Active, None)
    } else {
        let failing: Vec<String> = outcomes.iter().filter(|o| !o.ok).map(|o| o.node_id.clone()).collect();
        (ShardStatus::Failed, Some(format!("convergence failed on node(s): {}", failing.join(", "))))
    };

    topology_repo.update_shard_status(parsed.shard_id, new_status, status_message.clone()).await?;

    Ok(json!({ "shard_id": parsed.shard_id, "status": new_status, "status_message": status_message, "nodes": outcomes }))
}
