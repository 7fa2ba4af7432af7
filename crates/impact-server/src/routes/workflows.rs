use axum::extract::{Path, State};
use axum::Json;
use impact_core::model::Workflow;

use crate::error::AppError;
use crate::orchestrator::WorkflowAnalysis;
use crate::state::AppState;

/// GET /api/workflows: every workflow.
pub async fn list_workflows(State(app): State<AppState>) -> Result<Json<Vec<Workflow>>, AppError> {
    let store = app.store.clone();
    let workflows = tokio::task::spawn_blocking(move || store.workflows())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(workflows))
}

/// GET /api/workflows/{type}: workflows of one type. An unknown type is an
/// empty list.
pub async fn workflows_by_type(
    State(app): State<AppState>,
    Path(workflow_type): Path<String>,
) -> Result<Json<Vec<Workflow>>, AppError> {
    let store = app.store.clone();
    let workflows = tokio::task::spawn_blocking(move || store.workflows_by_type(&workflow_type))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(workflows))
}

/// GET /api/workflows/{id}/analysis
pub async fn workflow_analysis(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowAnalysis>, AppError> {
    let analysis = app.orchestrator.analyze_workflow(&id).await?;
    Ok(Json(analysis))
}
