use axum::body::Body;
use axum::http::{Request, StatusCode};
use hosting_domain::{hash_credential, ApiKey, ApiKeyId};
use hosting_orchestrator::prelude::*;
use hosting_store::MetadataStore;
use hosting_workflow::{ActivityRegistry, WorkflowEngine};
use std::sync::Arc;
use tower::ServiceExt;

fn test_settings() -> Settings {
    Settings {
        core_database_url: ":memory:".to_string(),
        core_database_auth_token: None,
        secret_encryption_key: None,
        audit_log_retention_days: 90,
        backup_retention_days: 30,
        metrics_addr: None,
        node_id: None,
        node_role: None,
        shard_name: None,
        region_id: None,
        cluster_id: None,
        acme_email: None,
        acme_directory_url: None,
        port: 0,
        node_agent_shared_secret: "test-secret".to_string(),
        convergence_fanout: 4,
        liveness_window_multiplier: 3,
    }
}

async fn test_state_with_key(scopes: Vec<&str>, brands: Vec<&str>) -> (AppState, String) {
    let store = MetadataStore::connect(":memory:", None).await.unwrap();
    let engine = WorkflowEngine::new(store.clone(), ActivityRegistry::new());
    let audit = hosting_orchestrator::services::audit::spawn(store.clone());
    let settings = Arc::new(test_settings());
    let state = AppState::new(store.clone(), engine, audit, settings);

    let raw_key = "test-raw-key";
    let api_key = ApiKey {
        id: ApiKeyId::new(),
        name: "test key".to_string(),
        key_hash: hash_credential(raw_key),
        scopes: scopes.into_iter().map(str::to_string).collect(),
        brands: brands.into_iter().map(str::to_string).collect(),
        revoked_at: None,
    };
    store.api_keys().unwrap().create(&api_key).await.unwrap();

    (state, raw_key.to_string())
}

#[tokio::test]
async fn request_without_api_key_is_rejected() {
    let (state, _raw_key) = test_state_with_key(vec!["*:*"], vec!["*"]).await;
    let router = hosting_orchestrator::routes::build_router(state);

    let response = router
        .oneshot(Request::builder().uri("/api/v1/tenants").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_bypasses_auth() {
    let (state, _raw_key) = test_state_with_key(vec!["*:*"], vec!["*"]).await;
    let router = hosting_orchestrator::routes::build_router(state);

    let response = router.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn creating_a_brand_outside_scope_is_forbidden() {
    let (state, raw_key) = test_state_with_key(vec!["tenant:read"], vec!["*"]).await;
    let router = hosting_orchestrator::routes::build_router(state);

    let body = serde_json::json!({
        "name": "acme",
        "base_hostname": "acme.example",
        "ns1": "ns1.acme.example",
        "ns2": "ns2.acme.example",
        "hostmaster_email": "hostmaster@acme.example",
    });

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/brands")
                .header("X-API-Key", raw_key)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_tenants_with_a_valid_key_succeeds() {
    let (state, raw_key) = test_state_with_key(vec!["tenant:read"], vec!["*"]).await;
    let router = hosting_orchestrator::routes::build_router(state);

    let response = router
        .oneshot(Request::builder().uri("/api/v1/tenants").header("X-API-Key", raw_key).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
