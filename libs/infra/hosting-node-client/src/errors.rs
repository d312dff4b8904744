//! Node-agent transport errors, classified at the boundary so activities
//! that use this client don't need to inspect `reqwest::Error` directly.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeClientError {
    #[error("node agent unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("node agent rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to decode node agent response: {0}")]
    Decoding(#[from] serde_json::Error),
}

impl NodeClientError {
    /// Whether the caller should retry. A 4xx rejection is terminal; a
    /// network failure or 5xx is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            NodeClientError::Unreachable(_) => true,
            NodeClientError::Rejected { status, .. } => *status >= 500,
            NodeClientError::Decoding(_) => false,
        }
    }
}

impl From<NodeClientError> for hosting_domain::ActivityError {
    fn from(err: NodeClientError) -> Self {
        if err.is_retryable() {
            hosting_domain::ActivityError::Retryable(err.to_string())
        } else {
            hosting_domain::ActivityError::Terminal(err.to_string())
        }
    }
}
