use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Request template a step points at. Every field except `method` may
/// contain `{{name}}` / `{{name:default}}` placeholders.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiCall {
    pub method: String,
    pub url: String,
    /// JSON object of header name to value template.
    pub headers: Option<String>,
    pub body: Option<String>,
    /// JSON object of query parameter name to value template.
    pub query_params: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Step {
    pub id: String,
    pub pipeline_id: String,
    /// 1-based, contiguous within the pipeline.
    pub step_order: i64,
    pub name: String,
    pub description: Option<String>,
    pub api_call_id: String,
    #[sqlx(flatten)]
    pub call: ApiCall,
    /// JSON object of output name to dot-path into the response body.
    pub data_extractions: Option<String>,
    /// Stored but never evaluated.
    pub data_injections: Option<String>,
    /// Stored but never evaluated.
    pub execution_condition: Option<String>,
    pub delay_after_ms: i64,
    pub skip: bool,
    pub active: bool,
}

impl Step {
    pub fn extraction_spec(&self) -> Option<&str> {
        self.data_extractions
            .as_deref()
            .map(str::trim)
            .filter(|spec| !spec.is_empty())
    }

    pub fn delay_after(&self) -> Option<Duration> {
        (self.delay_after_ms > 0).then(|| Duration::from_millis(self.delay_after_ms as u64))
    }
}
