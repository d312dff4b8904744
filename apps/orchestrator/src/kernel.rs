//! Composition root: wires the store, the workflow engine, every
//! registered activity/workflow/schedule, the background sweep loops,
//! and the HTTP router into one running server.

use crate::config::Settings;
use crate::routes::build_router;
use crate::services::{activities, audit, convergence, health_ingest, workflows};
use crate::state::AppState;
use hosting_store::MetadataStore;
use hosting_workflow::{schedule, WorkflowEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct OrchestratorKernel {
    pub settings: Arc<Settings>,
    pub state: AppState,
}

impl OrchestratorKernel {
    pub async fn ignite(settings: Settings) -> Self {
        let settings = Arc::new(settings);

        let store = MetadataStore::connect(&settings.core_database_url, settings.core_database_auth_token.clone())
            .await
            .expect("FATAL: could not connect to the metadata store");

        let registry = activities::build_registry(store.clone(), settings.clone());
        let engine = WorkflowEngine::new(store.clone(), registry);

        workflows::register(&engine, store.clone());
        convergence::register(&engine, store.clone());
        schedule::register_defaults(&engine).await.expect("FATAL: could not register default schedules");

        let audit_queue = audit::spawn(store.clone());
        let state = AppState::new(store, engine, audit_queue, settings.clone());

        Self { settings, state }
    }

    /// Spawns the background sweep loops and serves the HTTP router until
    /// the process is killed. Does not return under normal operation.
    pub async fn run(self) -> anyhow::Result<()> {
        tokio::spawn(health_ingest::run_liveness_sweep_loop(
            self.state.store.clone(),
            self.settings.liveness_window_multiplier,
        ));
        tokio::spawn(convergence::run_periodic_reconverge_loop(
            self.state.engine.clone(),
            self.state.store.clone(),
            self.settings.convergence_fanout,
        ));
        tokio::spawn(schedule::run_scheduler_loop(self.state.engine.clone()));

        let router = build_router(self.state);
        let addr = format!("0.0.0.0:{}", self.settings.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(%addr, "orchestrator listening");
        axum::serve(listener, router).await?;
        Ok(())
    }
}
