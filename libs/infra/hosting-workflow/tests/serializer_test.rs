use hosting_domain::{BrandId, ClusterId, RegionId, ShardId, Tenant, TenantId, TenantStatus};
use hosting_store::MetadataStore;
use hosting_workflow::{ActivityRegistry, Orchestration, WorkflowEngine};
use hosting_workflow::serializer::{self, ProvisionTask};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

async fn insert_tenant(store: &MetadataStore, status: TenantStatus) -> TenantId {
    let tenant = Tenant {
        id: TenantId::new(),
        brand_id: BrandId::new(),
        region_id: RegionId::new(),
        cluster_id: ClusterId::new(),
        shard_id: ShardId::new(),
        name: "acme".to_string(),
        uid: 10_000,
        sftp_enabled: true,
        ssh_enabled: false,
        disk_quota_mb: 1024,
        status,
        status_message: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    store.tenants().unwrap().create(&tenant).await.unwrap();
    tenant.id
}

#[tokio::test]
async fn tasks_for_one_tenant_run_in_fifo_order() {
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let tenant_id = insert_tenant(&store, TenantStatus::Active).await;

    let engine = WorkflowEngine::new(store, ActivityRegistry::new());
    engine.register_workflow(serializer::WORKFLOW_KIND, Arc::new(serializer::run_boxed));

    let order: Arc<std::sync::Mutex<Vec<u32>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

    for i in 0..3u32 {
        let order_for_child = order.clone();
        let workflow_id = format!("child-{i}");
        engine.register_workflow(
            workflow_id.clone(),
            Arc::new(move |_orchestration: Arc<Orchestration>, _args: serde_json::Value| {
                let order = order_for_child.clone();
                Box::pin(async move {
                    order.lock().unwrap().push(i);
                    Ok(serde_json::Value::Null)
                })
            }),
        );

        serializer::enqueue(
            &engine,
            tenant_id,
            ProvisionTask {
                workflow_name: workflow_id.clone(),
                workflow_id: workflow_id.clone(),
                args: serde_json::Value::Null,
                callback_url: None,
                resource_type: None,
                resource_id: None,
            },
        )
        .await
        .unwrap();
    }

    // Give the serializer's background loop time to drain the queue.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn draining_tenant_rejects_non_delete_tasks() {
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let tenant_id = insert_tenant(&store, TenantStatus::Deleting).await;

    let engine = WorkflowEngine::new(store, ActivityRegistry::new());
    engine.register_workflow(serializer::WORKFLOW_KIND, Arc::new(serializer::run_boxed));

    let ran = Arc::new(AtomicUsize::new(0));
    let ran_for_child = ran.clone();
    engine.register_workflow(
        "CreateWebrootWorkflow",
        Arc::new(move |_orchestration: Arc<Orchestration>, _args: serde_json::Value| {
            let ran = ran_for_child.clone();
            Box::pin(async move {
                ran.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(serde_json::Value::Null)
            })
        }),
    );

    serializer::enqueue(
        &engine,
        tenant_id,
        ProvisionTask {
            workflow_name: "CreateWebrootWorkflow".to_string(),
            workflow_id: "webroot-1".to_string(),
            args: serde_json::Value::Null,
            callback_url: None,
            resource_type: None,
            resource_id: None,
        },
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);
}
