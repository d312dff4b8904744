//! Single `IntoResponse` conversion from the domain error taxonomy to the
//! HTTP status codes of spec §6.1, so every handler's error path is uniform.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hosting_domain::OrchestrationError;
use serde_json::json;

pub struct ApiError(pub OrchestrationError);

impl From<OrchestrationError> for ApiError {
    fn from(err: OrchestrationError) -> Self {
        Self(err)
    }
}

impl From<hosting_store::StoreError> for ApiError {
    fn from(err: hosting_store::StoreError) -> Self {
        Self(err.into())
    }
}

impl From<hosting_workflow::WorkflowError> for ApiError {
    fn from(err: hosting_workflow::WorkflowError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use OrchestrationError as E;
        let status = match &self.0 {
            E::Validation(_) => StatusCode::BAD_REQUEST,
            E::AuthnAuthz => StatusCode::FORBIDDEN,
            E::NotFound => StatusCode::NOT_FOUND,
            E::Conflict(_) => StatusCode::CONFLICT,
            E::TransientInfrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
            E::TerminalInfrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            E::WorkflowCancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.0.status_message().unwrap_or_else(|| self.0.to_string());
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
