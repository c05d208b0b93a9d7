use crate::error::{AppError, Result};
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;

/// Hands out one cookie-aware HTTP client per run.
#[derive(Clone)]
pub struct SessionManager {
    step_timeout: Duration,
}

impl SessionManager {
    pub fn new(step_timeout: Duration) -> Self {
        Self { step_timeout }
    }

    pub fn open(&self, run_id: &str) -> Result<RunSession> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(self.step_timeout)
            .user_agent(format!("pipeline_runner/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Execution(format!("Failed to build HTTP session: {}", e)))?;

        tracing::debug!("Opened HTTP session for run {}", run_id);
        Ok(RunSession {
            run_id: run_id.to_string(),
            client,
            jar: Some(jar),
        })
    }
}

/// The transport shared by every step of one run. Cookies set by any
/// response are replayed on later requests of the same run only; the jar is
/// discarded when the session is dropped.
pub struct RunSession {
    run_id: String,
    client: reqwest::Client,
    jar: Option<Arc<Jar>>,
}

impl RunSession {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for RunSession {
    fn drop(&mut self) {
        self.jar.take();
        tracing::debug!("Closed HTTP session for run {}", self.run_id);
    }
}
