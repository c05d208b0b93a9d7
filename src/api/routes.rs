use super::handlers::{health, run};
use crate::services::RunService;
use axum::{
    Router,
    routing::{get, put},
};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub run_service: RunService,
}

pub fn create_router(run_service: RunService) -> Router {
    let state = AppState { run_service };

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Runs of a pipeline
        .route(
            "/api/pipelines/{id}/runs",
            get(run::list_runs).post(run::start_run),
        )
        // Run history
        .route("/api/runs/{id}", get(run::get_run))
        .route("/api/runs/{id}/steps", get(run::list_steps))
        .route("/api/runs/{id}/stop", put(run::stop_run))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
