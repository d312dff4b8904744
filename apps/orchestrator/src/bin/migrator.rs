//! Applies the metadata store schema and exits. `MetadataStore::connect`
//! already does this idempotently on every orchestrator startup; this
//! binary exists for operators who want schema application as an
//! explicit, auditable step ahead of a deploy rather than folded into
//! the service's own boot sequence.

use dotenvy::dotenv;
use hosting_store::MetadataStore;
use hosting_telemetry::init_tracing;
use tracing::info;

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing("hosting-migrator");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        let database_url = std::env::var("CORE_DATABASE_URL").expect("CORE_DATABASE_URL is required");
        let database_token = std::env::var("CORE_DATABASE_AUTH_TOKEN").ok();

        MetadataStore::connect(&database_url, database_token).await?;
        info!("schema applied");
        Ok(())
    })
}
