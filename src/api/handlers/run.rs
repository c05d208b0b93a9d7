use crate::api::dto::run::{
    RunResponse, RunsListResponse, StepExecutionResponse, StepExecutionsListResponse,
};
use crate::api::routes::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

pub async fn start_run(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> Result<(StatusCode, Json<RunResponse>)> {
    let run = state.run_service.start_run(&pipeline_id).await?;
    Ok((StatusCode::ACCEPTED, Json(RunResponse::from(run))))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> Result<Json<RunsListResponse>> {
    let runs = state.run_service.list_recent_runs(&pipeline_id).await?;
    Ok(Json(RunsListResponse {
        data: runs.into_iter().map(RunResponse::from).collect(),
    }))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunResponse>> {
    let run = state.run_service.get_run(&id).await?;
    Ok(Json(RunResponse::from(run)))
}

pub async fn list_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StepExecutionsListResponse>> {
    let records = state.run_service.list_step_executions(&id).await?;
    Ok(Json(StepExecutionsListResponse {
        data: records
            .into_iter()
            .map(StepExecutionResponse::from)
            .collect(),
    }))
}

pub async fn stop_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.run_service.stop_run(&id).await?;
    Ok(Json(serde_json::json!({
        "message": "Run stop requested"
    })))
}
