use crate::repository::DbPool;
use anyhow::Result;

pub async fn establish_connection(database_url: &str) -> Result<DbPool> {
    // Ensure the database URL has the correct format
    let db_url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{}", database_url)
    };

    // Create connection with create_if_missing option
    let connection_string = format!("{}?mode=rwc", db_url);
    let pool = sqlx::SqlitePool::connect(&connection_string).await?;

    sqlx::query(
        r#"
        -- Definitions, written by the pipeline editor
        CREATE TABLE IF NOT EXISTS pipelines (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            folder_id TEXT,
            active BOOLEAN NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS api_calls (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            method TEXT NOT NULL,
            url TEXT NOT NULL,
            headers TEXT,
            body TEXT,
            query_params TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pipeline_steps (
            id TEXT PRIMARY KEY,
            pipeline_id TEXT NOT NULL,
            step_order INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            api_call_id TEXT NOT NULL,
            data_extractions TEXT,
            data_injections TEXT,
            execution_condition TEXT,
            delay_after_ms INTEGER NOT NULL DEFAULT 0,
            skip BOOLEAN NOT NULL DEFAULT 0,
            active BOOLEAN NOT NULL DEFAULT 1,
            FOREIGN KEY (pipeline_id) REFERENCES pipelines(id),
            FOREIGN KEY (api_call_id) REFERENCES api_calls(id)
        );

        -- Run history, append-only
        CREATE TABLE IF NOT EXISTS pipeline_executions (
            id TEXT PRIMARY KEY,
            pipeline_id TEXT NOT NULL,
            status INTEGER NOT NULL,
            total_steps INTEGER NOT NULL,
            completed_steps INTEGER NOT NULL DEFAULT 0,
            successful_steps INTEGER NOT NULL DEFAULT 0,
            failed_steps INTEGER NOT NULL DEFAULT 0,
            skipped_steps INTEGER NOT NULL DEFAULT 0,
            started_at INTEGER NOT NULL,
            completed_at INTEGER,
            error_message TEXT
        );

        CREATE TABLE IF NOT EXISTS step_executions (
            id TEXT PRIMARY KEY,
            execution_id TEXT NOT NULL,
            step_id TEXT NOT NULL,
            step_order INTEGER NOT NULL,
            step_name TEXT NOT NULL,
            status INTEGER NOT NULL,
            started_at INTEGER NOT NULL,
            completed_at INTEGER,
            http_status INTEGER,
            response_time_ms INTEGER,
            request_method TEXT,
            request_url TEXT,
            request_headers TEXT,
            request_body TEXT,
            response_body TEXT,
            error_message TEXT,
            extracted_data TEXT,
            FOREIGN KEY (execution_id) REFERENCES pipeline_executions(id)
        );

        CREATE INDEX IF NOT EXISTS idx_pipeline_steps_pipeline_id ON pipeline_steps(pipeline_id, step_order);
        CREATE INDEX IF NOT EXISTS idx_pipeline_executions_pipeline_id ON pipeline_executions(pipeline_id, started_at);
        CREATE INDEX IF NOT EXISTS idx_step_executions_execution_id ON step_executions(execution_id, step_order);
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
