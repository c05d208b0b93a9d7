pub mod extractor;
pub mod http_executor;
pub mod session;
pub mod template;

pub use http_executor::{FailureKind, HttpStepExecutor, RequestSnapshot, ResponseSnapshot, StepOutcome};
pub use session::{RunSession, SessionManager};
