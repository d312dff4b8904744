use hosting_domain::ActivityError;
use hosting_store::MetadataStore;
use hosting_workflow::{ActivityRegistry, Orchestration, WorkflowEngine};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn test_engine() -> Arc<WorkflowEngine> {
    let store = MetadataStore::connect(":memory:", None).await.expect("in-memory store");
    WorkflowEngine::new(store, ActivityRegistry::new())
}

#[tokio::test]
async fn start_is_idempotent_and_runs_to_completion() {
    let engine = test_engine();
    let engine = engine.await;

    engine.register_workflow(
        "echo",
        Arc::new(|_orchestration: Arc<Orchestration>, args: serde_json::Value| {
            Box::pin(async move { Ok(args) })
        }),
    );

    engine.clone().start("echo", "wf-1", serde_json::json!({"value": 42}), None).await.unwrap();
    // A duplicate start with the same id must be a no-op, not an error.
    engine.clone().start("echo", "wf-1", serde_json::json!({"value": 99}), None).await.unwrap();

    let result = engine.await_result("wf-1", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, serde_json::json!({"value": 42}));
}

#[tokio::test]
async fn unknown_workflow_kind_is_rejected() {
    let engine = test_engine().await;
    let err = engine.clone().start("does-not-exist", "wf-2", serde_json::Value::Null, None).await.unwrap_err();
    assert!(matches!(err, hosting_workflow::WorkflowError::UnknownWorkflowKind(_)));
}

#[tokio::test]
async fn signal_wakes_a_suspended_workflow() {
    let engine = test_engine().await;

    engine.register_workflow(
        "awaiter",
        Arc::new(|orchestration: Arc<Orchestration>, _args: serde_json::Value| {
            Box::pin(async move { orchestration.await_signal("go").await })
        }),
    );

    engine.clone().start("awaiter", "wf-3", serde_json::Value::Null, None).await.unwrap();
    engine.signal("wf-3", "go", serde_json::json!("ready")).await.unwrap();

    let result = engine.await_result("wf-3", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, serde_json::json!("ready"));
}

#[tokio::test]
async fn failed_workflow_surfaces_as_activity_error() {
    let engine = test_engine().await;

    engine.register_workflow(
        "always-fails",
        Arc::new(|_orchestration: Arc<Orchestration>, _args: serde_json::Value| {
            Box::pin(async move {
                Err(hosting_workflow::WorkflowError::Activity(ActivityError::Terminal("boom".to_string())))
            })
        }),
    );

    engine.clone().start("always-fails", "wf-4", serde_json::Value::Null, None).await.unwrap();
    let err = engine.await_result("wf-4", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, hosting_workflow::WorkflowError::Activity(ActivityError::Terminal(_))));
}

#[tokio::test]
async fn activity_retries_until_it_succeeds() {
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_for_activity = attempts.clone();

    let mut activities = ActivityRegistry::new();
    activities.register(
        "flaky",
        Arc::new(move |_args: serde_json::Value| {
            let attempts = attempts_for_activity.clone();
            Box::pin(async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ActivityError::Retryable("not yet".to_string()))
                } else {
                    Ok(serde_json::json!("done"))
                }
            })
        }),
    );
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let engine = WorkflowEngine::new(store, activities);

    engine.register_workflow(
        "runs-flaky",
        Arc::new(|orchestration: Arc<Orchestration>, _args: serde_json::Value| {
            Box::pin(async move { orchestration.run_activity("flaky", serde_json::Value::Null).await })
        }),
    );

    engine.clone().start("runs-flaky", "wf-5", serde_json::Value::Null, None).await.unwrap();
    let result = engine.await_result("wf-5", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, serde_json::json!("done"));
}
