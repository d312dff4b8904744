//! Crate root: declares the orchestrator's module tree and re-exports
//! the handful of types `main.rs` needs to boot the process.

pub mod authz;
pub mod config;
pub mod error;
pub mod handlers;
pub mod kernel;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::{AppState, SystemMode};
}
