use hosting_orchestrator::prelude::*;

use dotenvy::dotenv;
use hosting_telemetry::init_tracing;
use tracing::info;

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing("hosting-orchestrator");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        let settings = Settings::from_env();
        let port = settings.port;

        let kernel = OrchestratorKernel::ignite(settings).await;
        info!(port, "orchestrator ignited, starting server");
        kernel.run().await
    })
}
