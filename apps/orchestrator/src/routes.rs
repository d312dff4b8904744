//! The HTTP route tree (spec §6.1, §6.2): `/health` is unauthenticated,
//! `/api/v1` carries the tenant-facing control-plane API behind
//! `auth_guard`/`health_guard` and the audit hook, `/internal/v1` is the
//! node-agent surface.

use crate::handlers::{api_keys, brands, health, node_agent, resources, tenants, topology};
use crate::middleware::{auth_guard, health_guard};
use crate::services::audit::audit_hook;
use crate::state::AppState;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::HeaderName::from_static("x-api-key")])
        .max_age(Duration::from_secs(3600));

    let api = Router::new()
        .route("/brands", get(brands::list_brands).post(brands::create_brand))
        .route("/regions", get(brands::list_regions).post(brands::create_region))
        .route("/regions/:region_id/clusters", get(brands::list_clusters_by_region))
        .route("/clusters", post(brands::create_cluster))
        .route("/api-keys", get(api_keys::list_api_keys).post(api_keys::create_api_key))
        .route("/api-keys/:key_id", axum::routing::delete(api_keys::revoke_api_key))
        .route("/tenants", get(tenants::list_tenants).post(tenants::create_tenant))
        .route("/tenants/:tenant_id", get(tenants::get_tenant).delete(tenants::delete_tenant))
        .route(
            "/tenants/:tenant_id/resources/:kind",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route("/resources/:resource_id", get(resources::get_resource).delete(resources::delete_resource))
        .route("/resources/:resource_id/retry", post(resources::retry_resource))
        .route("/clusters/:cluster_id/shards", get(topology::list_shards_by_cluster))
        .route("/shards", post(topology::create_shard))
        .route("/shards/:shard_id", get(topology::get_shard))
        .route("/shards/:shard_id/converge", post(topology::converge_shard))
        .route("/shards/:shard_id/nodes", get(topology::list_nodes_by_shard).post(topology::add_membership))
        .route("/shards/:shard_id/nodes/:node_id", axum::routing::delete(topology::remove_membership))
        .route("/nodes", post(topology::upsert_node))
        .route("/nodes/:node_id", get(topology::get_node))
        .layer(middleware::from_fn_with_state(state.clone(), audit_hook))
        .layer(middleware::from_fn(auth_guard))
        .layer(middleware::from_fn_with_state(state.clone(), health_guard));

    let internal = Router::new()
        .route("/nodes/:node_id/desired-state", get(node_agent::get_desired_state))
        .route("/nodes/:node_id/health", post(node_agent::post_health))
        .route("/nodes/:node_id/drift-events", post(node_agent::post_drift_events))
        .route("/cron-jobs/:cron_job_id/outcome", post(node_agent::post_cron_outcome))
        .layer(middleware::from_fn_with_state(state.clone(), health_guard));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api)
        .nest("/internal/v1", internal)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
