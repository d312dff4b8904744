//! The error taxonomy from spec §7, shared by every layer so a lower
//! layer's error is classified exactly once, at its origin, rather than
//! re-classified by each caller up the stack.

use thiserror::Error;

/// Kinds, not type names, per spec §7.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication or authorization failed")]
    AuthnAuthz,

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient infrastructure failure: {0}")]
    TransientInfrastructure(String),

    #[error("terminal infrastructure failure: {0}")]
    TerminalInfrastructure(String),

    #[error("workflow cancelled")]
    WorkflowCancelled,
}

impl OrchestrationError {
    /// Whether the owning saga should retry (transient) or run
    /// compensations and mark the resource `failed` (terminal).
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestrationError::TransientInfrastructure(_))
    }

    /// The `status_message` to attach to a resource transitioning to
    /// `failed`, safe for display to the caller.
    pub fn status_message(&self) -> Option<String> {
        match self {
            OrchestrationError::TerminalInfrastructure(msg) => Some(msg.clone()),
            OrchestrationError::Conflict(msg) => Some(msg.clone()),
            OrchestrationError::WorkflowCancelled => Some("cancelled".to_string()),
            _ => None,
        }
    }
}

/// The typed shape every activity classifies its own failures into
/// (spec §4.3). A worker-level interceptor (see `hosting-workflow`)
/// rewrites this into the form the runtime adapter understands, so
/// individual activities don't need to know about workflow semantics.
#[derive(Debug, Error, Clone)]
pub enum ActivityError {
    #[error("retryable: {0}")]
    Retryable(String),
    #[error("terminal: {0}")]
    Terminal(String),
}

impl From<ActivityError> for OrchestrationError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::Retryable(msg) => OrchestrationError::TransientInfrastructure(msg),
            ActivityError::Terminal(msg) => OrchestrationError::TerminalInfrastructure(msg),
        }
    }
}
