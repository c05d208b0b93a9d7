use crate::error::{AppError, Result};
use crate::models::{PipelineExecution, RunStatus, StepExecution};
use crate::repository::DbPool;

/// Run and step history. Every write goes straight to the pool so progress
/// is visible while a run is still going.
#[derive(Clone)]
pub struct ExecutionRepository {
    pool: DbPool,
}

impl ExecutionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_run(&self, pipeline_id: &str, total_steps: usize) -> Result<PipelineExecution> {
        let run = PipelineExecution::new(pipeline_id, total_steps);

        sqlx::query(
            r#"
            INSERT INTO pipeline_executions (id, pipeline_id, status, total_steps, completed_steps, successful_steps, failed_steps, skipped_steps, started_at, completed_at, error_message)
            VALUES (?, ?, ?, ?, 0, 0, 0, 0, ?, NULL, NULL)
            "#,
        )
        .bind(&run.id)
        .bind(&run.pipeline_id)
        .bind(run.status as i32)
        .bind(run.total_steps)
        .bind(run.started_at)
        .execute(&self.pool)
        .await?;

        Ok(run)
    }

    /// Writes the run's current fields. A row that already reached a
    /// terminal status is left untouched.
    pub async fn update_run(&self, run: &PipelineExecution) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE pipeline_executions
            SET status = ?, completed_steps = ?, successful_steps = ?, failed_steps = ?, skipped_steps = ?, completed_at = ?, error_message = ?
            WHERE id = ? AND status NOT IN (?, ?, ?)
            "#,
        )
        .bind(run.status as i32)
        .bind(run.completed_steps)
        .bind(run.successful_steps)
        .bind(run.failed_steps)
        .bind(run.skipped_steps)
        .bind(run.completed_at)
        .bind(&run.error_message)
        .bind(&run.id)
        .bind(RunStatus::Completed as i32)
        .bind(RunStatus::Failed as i32)
        .bind(RunStatus::Cancelled as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("Run {} is missing or already finished, update ignored", run.id);
        }

        Ok(())
    }

    pub async fn get_run(&self, id: &str) -> Result<PipelineExecution> {
        let run = sqlx::query_as::<_, PipelineExecution>(
            "SELECT * FROM pipeline_executions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::RunNotFound(id.to_string()))?;

        Ok(run)
    }

    pub async fn list_recent_runs(&self, pipeline_id: &str, limit: u32) -> Result<Vec<PipelineExecution>> {
        let runs = sqlx::query_as::<_, PipelineExecution>(
            "SELECT * FROM pipeline_executions WHERE pipeline_id = ? ORDER BY started_at DESC LIMIT ?",
        )
        .bind(pipeline_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }

    pub async fn create_step_execution(&self, record: &StepExecution) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO step_executions (id, execution_id, step_id, step_order, step_name, status, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.execution_id)
        .bind(&record.step_id)
        .bind(record.step_order)
        .bind(&record.step_name)
        .bind(record.status as i32)
        .bind(record.started_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_step_execution(&self, record: &StepExecution) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE step_executions
            SET status = ?, completed_at = ?, http_status = ?, response_time_ms = ?, request_method = ?, request_url = ?, request_headers = ?, request_body = ?, response_body = ?, error_message = ?, extracted_data = ?
            WHERE id = ?
            "#,
        )
        .bind(record.status as i32)
        .bind(record.completed_at)
        .bind(record.http_status)
        .bind(record.response_time_ms)
        .bind(&record.request_method)
        .bind(&record.request_url)
        .bind(&record.request_headers)
        .bind(&record.request_body)
        .bind(&record.response_body)
        .bind(&record.error_message)
        .bind(&record.extracted_data)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_step_executions(&self, run_id: &str) -> Result<Vec<StepExecution>> {
        let records = sqlx::query_as::<_, StepExecution>(
            "SELECT * FROM step_executions WHERE execution_id = ? ORDER BY step_order ASC, started_at ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
