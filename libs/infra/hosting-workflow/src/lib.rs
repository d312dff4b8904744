//! In-process, event-sourced workflow runtime: the adapter contract (M1),
//! the activity executor (L3), the per-tenant serializer (M2), and the
//! scheduled-jobs registrar (H4).

pub mod activity;
pub mod engine;
pub mod errors;
pub mod events;
pub mod orchestration;
pub mod schedule;
pub mod serializer;

pub use activity::{ActivityFn, ActivityRegistry, ActivityResult, RetryPolicy};
pub use engine::{WorkflowEngine, WorkflowFn};
pub use errors::WorkflowError;
pub use events::WorkflowEvent;
pub use orchestration::Orchestration;
pub use serializer::ProvisionTask;
