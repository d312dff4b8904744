//! Application services built on top of the domain/store/workflow crates:
//! the audit pipeline (L2), the desired-state projector (H1), the
//! convergence loop (H2), health/drift ingest (H3), the activity registry
//! (L3), and resource-workflow registration (M3).

pub mod activities;
pub mod audit;
pub mod convergence;
pub mod health_ingest;
pub mod projector;
pub mod workflows;
