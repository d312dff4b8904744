use hosting_domain::{Brand, Cluster, Node, NodeLiveness, Region, Shard, ShardRole, ShardStatus};
use hosting_orchestrator::services::convergence;
use hosting_store::MetadataStore;
use hosting_workflow::{ActivityRegistry, WorkflowEngine};
use std::sync::Arc;
use std::time::Duration;

async fn seeded_lb_shard(store: &MetadataStore) -> (Cluster, Shard, Node) {
    let brand_repo = store.brands().unwrap();
    let topology_repo = store.topology().unwrap();

    let brand = Brand {
        id: hosting_domain::BrandId::new(),
        name: "acme".to_string(),
        base_hostname: "acme.example".to_string(),
        ns1: "ns1.acme.example".to_string(),
        ns2: "ns2.acme.example".to_string(),
        hostmaster_email: "hostmaster@acme.example".to_string(),
    };
    brand_repo.create_brand(&brand).await.unwrap();

    let region = Region { id: hosting_domain::RegionId::new(), name: "us-east".to_string() };
    brand_repo.create_region(&region).await.unwrap();

    let cluster = Cluster { id: hosting_domain::ClusterId::new(), region_id: region.id, name: "c1".to_string(), brand_ids: vec![brand.id] };
    brand_repo.create_cluster(&cluster).await.unwrap();

    let shard = Shard {
        id: hosting_domain::ShardId::new(),
        cluster_id: cluster.id,
        role: ShardRole::Lb,
        name: "lb-1".to_string(),
        status: ShardStatus::Converging,
        status_message: None,
        role_config: serde_json::json!({}),
    };
    topology_repo.create_shard(&shard).await.unwrap();

    let node = Node { id: hosting_domain::NodeId::new(), hostname: "lb-1.node.internal".to_string(), liveness: NodeLiveness::Healthy, last_health_at: None };
    topology_repo.upsert_node(&node).await.unwrap();
    topology_repo.add_membership(shard.id, node.id, ShardRole::Lb).await.unwrap();

    (cluster, shard, node)
}

#[tokio::test]
async fn converge_shard_workflow_marks_shard_active_on_success() {
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let (_cluster, shard, _node) = seeded_lb_shard(&store).await;

    let mut activities = ActivityRegistry::new();
    activities.register(
        "node.push_desired_state",
        Arc::new(|_args: serde_json::Value| Box::pin(async move { Ok(serde_json::Value::Null) })),
    );

    let engine = WorkflowEngine::new(store.clone(), activities);
    convergence::register(&engine, store.clone());

    convergence::trigger(&engine, shard.id, 4).await.unwrap();

    let workflow_id = convergence::workflow_id_for(shard.id);
    let result = engine.await_result(&workflow_id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(result["status"], serde_json::json!("active"));

    let refreshed = store.topology().unwrap().get_shard(shard.id).await.unwrap();
    assert_eq!(refreshed.status, ShardStatus::Active);
}

#[tokio::test]
async fn converge_shard_workflow_marks_shard_failed_when_a_node_push_fails() {
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let (_cluster, shard, _node) = seeded_lb_shard(&store).await;

    let mut activities = ActivityRegistry::new();
    activities.register(
        "node.push_desired_state",
        Arc::new(|_args: serde_json::Value| {
            Box::pin(async move { Err(hosting_domain::ActivityError::Terminal("push refused".to_string())) })
        }),
    );

    let engine = WorkflowEngine::new(store.clone(), activities);
    convergence::register(&engine, store.clone());
    convergence::trigger(&engine, shard.id, 4).await.unwrap();

    let workflow_id = convergence::workflow_id_for(shard.id);
    let result = engine.await_result(&workflow_id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(result["status"], serde_json::json!("failed"));

    let refreshed = store.topology().unwrap().get_shard(shard.id).await.unwrap();
    assert_eq!(refreshed.status, ShardStatus::Failed);
}

#[tokio::test]
async fn triggering_convergence_twice_is_idempotent() {
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let (_cluster, shard, _node) = seeded_lb_shard(&store).await;

    let mut activities = ActivityRegistry::new();
    activities.register(
        "node.push_desired_state",
        Arc::new(|_args: serde_json::Value| Box::pin(async move { Ok(serde_json::Value::Null) })),
    );

    let engine = WorkflowEngine::new(store.clone(), activities);
    convergence::register(&engine, store.clone());

    convergence::trigger(&engine, shard.id, 4).await.unwrap();
    convergence::trigger(&engine, shard.id, 4).await.unwrap();

    let workflow_id = convergence::workflow_id_for(shard.id);
    let result = engine.await_result(&workflow_id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(result["status"], serde_json::json!("active"));
}
