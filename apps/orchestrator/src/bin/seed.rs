//! Development seed data: one brand, one region/cluster, a web and a
//! database shard with a single node each, and a pending tenant pinned
//! to that cluster. Safe to run repeatedly -- every insert tolerates a
//! pre-existing row with the same natural key.

use dotenvy::dotenv;
use hosting_domain::{
    Brand, BrandId, Cluster, ClusterId, Node, NodeId, NodeLiveness, Region, RegionId, Shard, ShardId, ShardRole,
    ShardStatus, Tenant, TenantId, TenantStatus,
};
use hosting_store::MetadataStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").with_target(false).init();

    let database_url = std::env::var("CORE_DATABASE_URL").expect("CORE_DATABASE_URL is required");
    let database_token = std::env::var("CORE_DATABASE_AUTH_TOKEN").ok();
    let store = MetadataStore::connect(&database_url, database_token).await?;

    let brand = Brand {
        id: BrandId::new(),
        name: "acme-hosting".to_string(),
        base_hostname: "acme-hosting.example".to_string(),
        ns1: "ns1.acme-hosting.example".to_string(),
        ns2: "ns2.acme-hosting.example".to_string(),
        hostmaster_email: "hostmaster@acme-hosting.example".to_string(),
    };
    if let Err(e) = store.brands()?.create_brand(&brand).await {
        warn!(error = %e, "brand seed skipped, likely already present");
    } else {
        info!(brand_id = %brand.id, "seeded brand");
    }

    let region = Region { id: RegionId::new(), name: "us-east".to_string() };
    store.brands()?.create_region(&region).await.ok();
    info!(region_id = %region.id, "seeded region");

    let cluster = Cluster { id: ClusterId::new(), region_id: region.id, name: "use1-c1".to_string(), brand_ids: vec![brand.id] };
    store.brands()?.create_cluster(&cluster).await.ok();
    info!(cluster_id = %cluster.id, "seeded cluster");

    let web_shard = Shard {
        id: ShardId::new(),
        cluster_id: cluster.id,
        role: ShardRole::Web,
        name: "use1-c1-web-01".to_string(),
        status: ShardStatus::Active,
        status_message: None,
        role_config: serde_json::json!({}),
    };
    store.topology()?.create_shard(&web_shard).await.ok();

    let db_shard = Shard {
        id: ShardId::new(),
        cluster_id: cluster.id,
        role: ShardRole::Database,
        name: "use1-c1-db-01".to_string(),
        status: ShardStatus::Active,
        status_message: None,
        role_config: serde_json::json!({ "cron_interval_minutes": 5 }),
    };
    store.topology()?.create_shard(&db_shard).await.ok();
    info!(web_shard = %web_shard.id, db_shard = %db_shard.id, "seeded shards");

    let web_node = Node { id: NodeId::new(), hostname: "web01.use1-c1.internal".to_string(), liveness: NodeLiveness::Unknown, last_health_at: None };
    store.topology()?.upsert_node(&web_node).await.ok();
    store.topology()?.add_membership(web_shard.id, web_node.id, ShardRole::Web).await.ok();

    let db_node = Node { id: NodeId::new(), hostname: "db01.use1-c1.internal".to_string(), liveness: NodeLiveness::Unknown, last_health_at: None };
    store.topology()?.upsert_node(&db_node).await.ok();
    store.topology()?.add_membership(db_shard.id, db_node.id, ShardRole::Database).await.ok();
    info!("seeded nodes and memberships");

    let uid = store.tenants()?.reserve_next_uid().await?;
    let now = chrono::Utc::now();
    let tenant = Tenant {
        id: TenantId::new(),
        brand_id: brand.id,
        region_id: region.id,
        cluster_id: cluster.id,
        shard_id: web_shard.id,
        name: "demo-tenant".to_string(),
        uid,
        sftp_enabled: true,
        ssh_enabled: false,
        disk_quota_mb: 10_240,
        status: TenantStatus::Pending,
        status_message: None,
        created_at: now,
        updated_at: now,
    };
    store.tenants()?.create(&tenant).await.ok();
    info!(tenant_id = %tenant.id, uid, "seeded tenant");

    info!("seed complete");
    Ok(())
}
