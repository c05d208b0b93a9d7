pub mod context;
pub mod execution;
pub mod pipeline;

pub use context::{Context, ContextValue};
pub use execution::{PipelineExecution, RunStatus, StepExecution, StepStatus};
pub use pipeline::{ApiCall, Pipeline, Step};

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
