use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use impact_core::ImpactError;

use crate::orchestrator::OrchestratorError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ImpactError::Validation(msg.into()).into())
    }
}

fn status_for(err: &ImpactError) -> StatusCode {
    match err {
        ImpactError::WorkflowNotFound(_)
        | ImpactError::SystemNotFound(_)
        | ImpactError::RegulationNotFound(_)
        | ImpactError::AssessmentNotFound(_) => StatusCode::NOT_FOUND,
        ImpactError::Validation(_) | ImpactError::NotInitialized => StatusCode::BAD_REQUEST,
        ImpactError::CollaboratorUnavailable { .. } => StatusCode::BAD_GATEWAY,
        ImpactError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ImpactError::Store(_) | ImpactError::Io(_) | ImpactError::Yaml(_) | ImpactError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // A failed assessment is returned alongside the error.
        if let Some(OrchestratorError::Failed { assessment, source }) =
            self.0.downcast_ref::<OrchestratorError>()
        {
            let body = serde_json::json!({
                "error": source.to_string(),
                "assessment": assessment,
            });
            return (status_for(source), axum::Json(body)).into_response();
        }

        let status = if let Some(OrchestratorError::Impact(e)) =
            self.0.downcast_ref::<OrchestratorError>()
        {
            status_for(e)
        } else if let Some(e) = self.0.downcast_ref::<ImpactError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
