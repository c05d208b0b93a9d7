use crate::error::{AppError, Result};
use crate::models::{ApiCall, Pipeline, Step, now_millis};
use crate::repository::DbPool;

/// Read access to pipeline definitions, plus the inserts used to seed them.
#[derive(Clone)]
pub struct PipelineRepository {
    pool: DbPool,
}

/// Fields of a step as authored, before it is stored.
#[derive(Debug, Clone, Default)]
pub struct NewStep {
    pub step_order: i64,
    pub name: String,
    pub description: Option<String>,
    pub api_call_id: String,
    pub data_extractions: Option<String>,
    pub delay_after_ms: i64,
    pub skip: bool,
    pub active: bool,
}

impl PipelineRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Soft-deleted pipelines are reported as missing.
    pub async fn get(&self, id: &str) -> Result<Pipeline> {
        let pipeline =
            sqlx::query_as::<_, Pipeline>("SELECT * FROM pipelines WHERE id = ? AND active = 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::PipelineNotFound(id.to_string()))?;

        Ok(pipeline)
    }

    pub async fn get_active_steps(&self, pipeline_id: &str) -> Result<Vec<Step>> {
        let steps = sqlx::query_as::<_, Step>(
            r#"
            SELECT s.id, s.pipeline_id, s.step_order, s.name, s.description, s.api_call_id,
                   c.method, c.url, c.headers, c.body, c.query_params,
                   s.data_extractions, s.data_injections, s.execution_condition,
                   s.delay_after_ms, s.skip, s.active
            FROM pipeline_steps s
            JOIN api_calls c ON c.id = s.api_call_id
            WHERE s.pipeline_id = ? AND s.active = 1
            ORDER BY s.step_order ASC
            "#,
        )
        .bind(pipeline_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(steps)
    }

    pub async fn create_pipeline(&self, name: &str, description: Option<&str>) -> Result<Pipeline> {
        let now = now_millis();
        let pipeline = Pipeline {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            folder_id: None,
            active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO pipelines (id, name, description, folder_id, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pipeline.id)
        .bind(&pipeline.name)
        .bind(&pipeline.description)
        .bind(&pipeline.folder_id)
        .bind(pipeline.active)
        .bind(pipeline.created_at)
        .bind(pipeline.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(pipeline)
    }

    pub async fn create_api_call(&self, name: &str, call: &ApiCall) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO api_calls (id, name, method, url, headers, body, query_params, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(&call.method)
        .bind(&call.url)
        .bind(&call.headers)
        .bind(&call.body)
        .bind(&call.query_params)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn create_step(&self, pipeline_id: &str, step: &NewStep) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO pipeline_steps (id, pipeline_id, step_order, name, description, api_call_id, data_extractions, delay_after_ms, skip, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(pipeline_id)
        .bind(step.step_order)
        .bind(&step.name)
        .bind(&step.description)
        .bind(&step.api_call_id)
        .bind(&step.data_extractions)
        .bind(step.delay_after_ms)
        .bind(step.skip)
        .bind(step.active)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn update_active(&self, pipeline_id: &str, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE pipelines SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(now_millis())
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::PipelineNotFound(pipeline_id.to_string()));
        }

        Ok(())
    }
}
