//! Workflow-adapter error catalog.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("store error: {0}")]
    Store(#[from] hosting_store::StoreError),

    #[error("event encoding failed: {0}")]
    Encoding(String),

    #[error("no workflow kind registered as '{0}'")]
    UnknownWorkflowKind(String),

    #[error("no activity registered as '{0}'")]
    UnknownActivity(String),

    #[error("timed out awaiting workflow '{0}'")]
    AwaitTimeout(String),

    #[error("workflow '{0}' not found")]
    NotFound(String),

    #[error("activity failed: {0}")]
    Activity(#[from] hosting_domain::ActivityError),
}

impl From<WorkflowError> for hosting_domain::OrchestrationError {
    fn from(err: WorkflowError) -> Self {
        use hosting_domain::OrchestrationError as E;
        match err {
            WorkflowError::Store(store_err) => store_err.into(),
            WorkflowError::NotFound(_) => E::NotFound,
            WorkflowError::AwaitTimeout(msg) => E::TransientInfrastructure(format!("await timeout: {msg}")),
            WorkflowError::Activity(activity_err) => activity_err.into(),
            other => E::TerminalInfrastructure(other.to_string()),
        }
    }
}
