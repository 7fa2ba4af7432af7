pub mod error;
pub mod orchestrator;
pub mod routes;
pub mod state;
pub mod tickets;

use std::path::PathBuf;

use axum::routing::{get, post};
use axum::Router;
use impact_core::{ImpactError, Result};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use orchestrator::{Orchestrator, OrchestratorError, WorkflowAnalysis};
pub use state::AppState;
pub use tickets::{DispatchReport, TicketDispatcher};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Workflows
        .route("/api/workflows", get(routes::workflows::list_workflows))
        .route(
            "/api/workflows/{workflow}",
            get(routes::workflows::workflows_by_type),
        )
        .route(
            "/api/workflows/{workflow}/analysis",
            get(routes::workflows::workflow_analysis),
        )
        // Impact assessments
        .route(
            "/api/impact-assessment",
            post(routes::assessments::create_assessment),
        )
        .route(
            "/api/impact-assessment/{id}",
            get(routes::assessments::get_assessment),
        )
        .route(
            "/api/impact-assessment/{id}/retry",
            post(routes::assessments::retry_assessment),
        )
        .route(
            "/api/impact-assessments",
            get(routes::assessments::list_assessments),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `bind:port`.
pub async fn serve(root: PathBuf, bind: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    serve_on(root, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(AppState::new(root)?);

    tracing::info!("impact assessment API listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run blocking store or analysis work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ImpactError::Store(format!("task join error: {e}")))?
}
