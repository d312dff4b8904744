//! Process-wide shared state: the metadata store, the workflow engine
//! handle, the bounded audit queue's producer side, and the operational
//! mode gate consulted by `middleware::health_guard`.

use crate::config::Settings;
use crate::services::audit::AuditQueue;
use hosting_store::MetadataStore;
use hosting_workflow::WorkflowEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMode {
    Operational,
    Maintenance(String),
}

#[derive(Clone)]
pub struct AppState {
    pub store: MetadataStore,
    pub engine: Arc<WorkflowEngine>,
    pub audit: AuditQueue,
    pub settings: Arc<Settings>,
    mode: Arc<RwLock<SystemMode>>,
    schema_ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(store: MetadataStore, engine: Arc<WorkflowEngine>, audit: AuditQueue, settings: Arc<Settings>) -> Self {
        Self {
            store,
            engine,
            audit,
            settings,
            mode: Arc::new(RwLock::new(SystemMode::Operational)),
            schema_ready: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_mode(&self, mode: SystemMode) {
        *self.mode.write().expect("system mode lock poisoned") = mode;
    }

    /// Consulted by `health_guard` on every request under `/api/v1` and
    /// `/internal/v1`. `/health` itself bypasses this.
    pub fn is_operational(&self) -> Result<(), String> {
        match &*self.mode.read().expect("system mode lock poisoned") {
            SystemMode::Operational if self.schema_ready.load(Ordering::SeqCst) => Ok(()),
            SystemMode::Operational => Err("schema not yet ready".to_string()),
            SystemMode::Maintenance(reason) => Err(reason.clone()),
        }
    }
}
