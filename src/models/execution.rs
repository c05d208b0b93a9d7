use super::now_millis;
use serde::{Deserialize, Serialize};

/// One run of a pipeline together with its aggregate counters.
///
/// The counter methods keep `completed_steps == successful_steps +
/// failed_steps + skipped_steps` after every step, and none of them move a
/// run out of a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PipelineExecution {
    pub id: String,
    pub pipeline_id: String,
    pub status: RunStatus,
    pub total_steps: i64,
    pub completed_steps: i64,
    pub successful_steps: i64,
    pub failed_steps: i64,
    pub skipped_steps: i64,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[repr(i32)]
pub enum RunStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl PipelineExecution {
    pub fn new(pipeline_id: &str, total_steps: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pipeline_id: pipeline_id.to_string(),
            status: RunStatus::Pending,
            total_steps: total_steps as i64,
            completed_steps: 0,
            successful_steps: 0,
            failed_steps: 0,
            skipped_steps: 0,
            started_at: now_millis(),
            completed_at: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_running(&mut self) {
        if self.status == RunStatus::Pending {
            self.status = RunStatus::Running;
        }
    }

    pub fn record_skipped(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.completed_steps += 1;
        self.skipped_steps += 1;
    }

    pub fn record_success(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.completed_steps += 1;
        self.successful_steps += 1;
    }

    /// Counts the failed step and moves the run to `Failed`.
    pub fn record_failure(&mut self, step_order: i64, cause: &str) {
        if self.is_terminal() {
            return;
        }
        self.completed_steps += 1;
        self.failed_steps += 1;
        self.status = RunStatus::Failed;
        self.error_message = Some(format!("Step {} failed: {}", step_order, cause));
        self.completed_at = Some(now_millis());
    }

    pub fn complete(&mut self) {
        self.finish(RunStatus::Completed);
    }

    pub fn cancel(&mut self) {
        self.finish(RunStatus::Cancelled);
    }

    fn finish(&mut self, status: RunStatus) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        self.completed_at = Some(now_millis());
    }
}

/// Durable record of a single step inside a run. Order and name are
/// snapshotted so the record outlives edits to the step itself.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StepExecution {
    pub id: String,
    pub execution_id: String,
    pub step_id: String,
    pub step_order: i64,
    pub step_name: String,
    pub status: StepStatus,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub http_status: Option<i64>,
    pub response_time_ms: Option<i64>,
    pub request_method: Option<String>,
    pub request_url: Option<String>,
    /// JSON object of the headers actually sent.
    pub request_headers: Option<String>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    /// JSON object of the variables extracted from the response.
    pub extracted_data: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[repr(i32)]
pub enum StepStatus {
    Running = 0,
    Success = 1,
    Failed = 2,
    Skipped = 3,
}

impl StepExecution {
    pub fn new(execution_id: &str, step_id: &str, step_order: i64, step_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            execution_id: execution_id.to_string(),
            step_id: step_id.to_string(),
            step_order,
            step_name: step_name.to_string(),
            status: StepStatus::Running,
            started_at: now_millis(),
            completed_at: None,
            http_status: None,
            response_time_ms: None,
            request_method: None,
            request_url: None,
            request_headers: None,
            request_body: None,
            response_body: None,
            error_message: None,
            extracted_data: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.status = StepStatus::Skipped;
        self.completed_at = Some(self.started_at);
        self
    }
}
