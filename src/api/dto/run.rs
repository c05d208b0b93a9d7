use crate::models::{PipelineExecution, StepExecution};
use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub id: String,
    pub pipeline_id: String,
    pub status: String,
    pub total_steps: i64,
    pub completed_steps: i64,
    pub successful_steps: i64,
    pub failed_steps: i64,
    pub skipped_steps: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

impl From<PipelineExecution> for RunResponse {
    fn from(run: PipelineExecution) -> Self {
        Self {
            id: run.id,
            pipeline_id: run.pipeline_id,
            status: format!("{:?}", run.status).to_uppercase(),
            total_steps: run.total_steps,
            completed_steps: run.completed_steps,
            successful_steps: run.successful_steps,
            failed_steps: run.failed_steps,
            skipped_steps: run.skipped_steps,
            started_at: to_rfc3339(run.started_at),
            completed_at: run.completed_at.map(to_rfc3339),
            error_message: run.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepExecutionResponse {
    pub id: String,
    pub step_id: String,
    pub step_order: i64,
    pub step_name: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub http_status: Option<i64>,
    pub response_time_ms: Option<i64>,
    pub request_method: Option<String>,
    pub request_url: Option<String>,
    pub request_headers: Option<Value>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub extracted_data: Option<Value>,
}

impl From<StepExecution> for StepExecutionResponse {
    fn from(record: StepExecution) -> Self {
        Self {
            id: record.id,
            step_id: record.step_id,
            step_order: record.step_order,
            step_name: record.step_name,
            status: format!("{:?}", record.status).to_uppercase(),
            started_at: to_rfc3339(record.started_at),
            completed_at: record.completed_at.map(to_rfc3339),
            http_status: record.http_status,
            response_time_ms: record.response_time_ms,
            request_method: record.request_method,
            request_url: record.request_url,
            request_headers: parse_json(record.request_headers.as_deref()),
            request_body: record.request_body,
            response_body: record.response_body,
            error_message: record.error_message,
            extracted_data: parse_json(record.extracted_data.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunsListResponse {
    pub data: Vec<RunResponse>,
}

#[derive(Debug, Serialize)]
pub struct StepExecutionsListResponse {
    pub data: Vec<StepExecutionResponse>,
}

fn to_rfc3339(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

fn parse_json(raw: Option<&str>) -> Option<Value> {
    raw.and_then(|raw| serde_json::from_str(raw).ok())
}
