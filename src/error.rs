use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Pipeline '{0}' has no active steps")]
    NoActiveSteps(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl AppError {
    /// Errors caused by the stored pipeline definition rather than by the
    /// engine or its storage.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::PipelineNotFound(_) | AppError::NoActiveSteps(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::PipelineNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Pipeline '{}' not found", id),
            ),
            AppError::RunNotFound(id) => (StatusCode::NOT_FOUND, format!("Run '{}' not found", id)),
            AppError::NoActiveSteps(id) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Pipeline '{}' has no active steps", id),
            ),
            AppError::Execution(e) => (StatusCode::BAD_REQUEST, e),
        };

        let body = json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
