//! Store-level error catalog. Each variant classifies a failure at its
//! origin; callers convert into `hosting_domain::OrchestrationError` at
//! the layer boundary rather than re-classifying it themselves.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("row mapping failed: {0}")]
    Mapping(String),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for hosting_domain::OrchestrationError {
    fn from(err: StoreError) -> Self {
        use hosting_domain::OrchestrationError as E;
        match err {
            StoreError::NotFound => E::NotFound,
            StoreError::Conflict(msg) => E::Conflict(msg),
            other => E::TransientInfrastructure(other.to_string()),
        }
    }
}
