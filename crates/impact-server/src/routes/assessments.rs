use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use impact_core::model::{AssessmentRequest, ImpactAssessment};
use impact_core::store::AssessmentFilter;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/impact-assessment: body `{workflowId, regulationId, changeDescription}`.
///
/// 201 with the COMPLETE assessment. A collaborator failure answers 502 with
/// the FAILED assessment in the body; a body that is not a request object
/// answers 400.
pub async fn create_assessment(
    State(app): State<AppState>,
    body: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ImpactAssessment>), AppError> {
    let Json(request) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let assessment = app
        .orchestrator
        .generate_impact_assessment(request)
        .await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// GET /api/impact-assessment/{id}
pub async fn get_assessment(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImpactAssessment>, AppError> {
    let assessment = app.orchestrator.get_impact_assessment(&id).await?;
    Ok(Json(assessment))
}

/// POST /api/impact-assessment/{id}/retry
pub async fn retry_assessment(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImpactAssessment>, AppError> {
    let assessment = app.orchestrator.retry_assessment(&id).await?;
    Ok(Json(assessment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub workflow_id: Option<String>,
    pub regulation_id: Option<String>,
}

/// GET /api/impact-assessments?workflowId=&regulationId=: newest first.
pub async fn list_assessments(
    State(app): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ImpactAssessment>>, AppError> {
    let filter = AssessmentFilter {
        workflow_id: params.workflow_id.filter(|s| !s.is_empty()),
        regulation_id: params.regulation_id.filter(|s| !s.is_empty()),
    };
    let assessments = app.orchestrator.list_assessments(filter).await?;
    Ok(Json(assessments))
}
