use crate::error::{AppError, Result};
use crate::executor::{HttpStepExecutor, RunSession, SessionManager, StepOutcome};
use crate::models::{Context, PipelineExecution, StepExecution, StepStatus, Step, now_millis};
use crate::repository::{ExecutionRepository, PipelineRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Drives pipeline runs: one step at a time, stopping at the first failure.
#[derive(Clone)]
pub struct RunService {
    pipeline_repo: PipelineRepository,
    exec_repo: ExecutionRepository,
    sessions: SessionManager,
    executor: HttpStepExecutor,
    in_flight: Arc<Mutex<HashMap<String, CancellationToken>>>,
    recent_runs_limit: u32,
}

impl RunService {
    pub fn new(
        pipeline_repo: PipelineRepository,
        exec_repo: ExecutionRepository,
        sessions: SessionManager,
        recent_runs_limit: u32,
    ) -> Self {
        Self {
            pipeline_repo,
            exec_repo,
            sessions,
            executor: HttpStepExecutor::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            recent_runs_limit,
        }
    }

    /// Creates the run record and executes it on a background task. The
    /// returned run is already persisted, so it can be polled right away.
    pub async fn start_run(&self, pipeline_id: &str) -> Result<PipelineExecution> {
        let (run, steps) = self.prepare_run(pipeline_id).await?;
        let cancel = self.register(&run.id).await;

        let service = self.clone();
        let queued = run.clone();
        tokio::spawn(async move {
            let run_id = queued.id.clone();
            if let Err(e) = service.drive(queued, steps, cancel).await {
                tracing::error!("Run {} aborted: {}", run_id, e);
            }
            service.unregister(&run_id).await;
        });

        Ok(run)
    }

    /// Executes a run to the end and returns its final state.
    pub async fn run_pipeline(&self, pipeline_id: &str) -> Result<PipelineExecution> {
        let (run, steps) = self.prepare_run(pipeline_id).await?;
        let run_id = run.id.clone();
        let cancel = self.register(&run_id).await;

        let result = self.drive(run, steps, cancel).await;
        self.unregister(&run_id).await;
        result
    }

    /// Asks an in-flight run to stop before its next step.
    pub async fn stop_run(&self, run_id: &str) -> Result<()> {
        if let Some(cancel) = self.in_flight.lock().await.get(run_id) {
            tracing::info!("Stopping run {}", run_id);
            cancel.cancel();
            return Ok(());
        }

        let run = self.exec_repo.get_run(run_id).await?;
        if run.is_terminal() {
            return Ok(());
        }
        Err(AppError::Execution(format!(
            "Run '{}' is not executing in this process",
            run_id
        )))
    }

    pub async fn get_run(&self, run_id: &str) -> Result<PipelineExecution> {
        self.exec_repo.get_run(run_id).await
    }

    pub async fn list_step_executions(&self, run_id: &str) -> Result<Vec<StepExecution>> {
        self.exec_repo.get_run(run_id).await?;
        self.exec_repo.list_step_executions(run_id).await
    }

    pub async fn list_recent_runs(&self, pipeline_id: &str) -> Result<Vec<PipelineExecution>> {
        self.exec_repo
            .list_recent_runs(pipeline_id, self.recent_runs_limit)
            .await
    }

    async fn prepare_run(&self, pipeline_id: &str) -> Result<(PipelineExecution, Vec<Step>)> {
        let pipeline = self.pipeline_repo.get(pipeline_id).await?;
        let steps = self.pipeline_repo.get_active_steps(&pipeline.id).await?;
        if steps.is_empty() {
            return Err(AppError::NoActiveSteps(pipeline.id));
        }

        let run = self.exec_repo.create_run(&pipeline.id, steps.len()).await?;
        tracing::info!(
            "Created run {} for pipeline '{}' ({} steps)",
            run.id,
            pipeline.name,
            steps.len()
        );
        Ok((run, steps))
    }

    async fn drive(
        &self,
        mut run: PipelineExecution,
        steps: Vec<Step>,
        cancel: CancellationToken,
    ) -> Result<PipelineExecution> {
        let session = self.sessions.open(&run.id)?;
        run.mark_running();
        self.exec_repo.update_run(&run).await?;

        let mut context = Context::empty();
        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.finish_cancelled(run, session).await;
            }

            if step.skip {
                let record = StepExecution::new(&run.id, &step.id, step.step_order, &step.name).skipped();
                self.exec_repo.create_step_execution(&record).await?;
                run.record_skipped();
                self.exec_repo.update_run(&run).await?;
                tracing::debug!("Run {} skipped step {}", run.id, step.step_order);
                continue;
            }

            let mut record = StepExecution::new(&run.id, &step.id, step.step_order, &step.name);
            self.exec_repo.create_step_execution(&record).await?;

            match self.executor.execute(step, &context, &session).await {
                StepOutcome::Success {
                    request,
                    response,
                    extracted,
                } => {
                    record.status = StepStatus::Success;
                    record.completed_at = Some(now_millis());
                    record.request_method = Some(request.method.clone());
                    record.request_url = Some(request.url.clone());
                    record.request_headers = serde_json::to_string(&request.headers).ok();
                    record.request_body = request.body;
                    record.http_status = Some(response.status as i64);
                    record.response_time_ms = Some(response.elapsed_ms);
                    record.response_body = Some(response.body);
                    record.extracted_data = Some(extracted.to_json().to_string());
                    self.exec_repo.update_step_execution(&record).await?;

                    run.record_success();
                    self.exec_repo.update_run(&run).await?;
                    context = extracted;
                }
                StepOutcome::Failure {
                    kind,
                    detail,
                    request,
                    response,
                } => {
                    record.status = StepStatus::Failed;
                    record.completed_at = Some(now_millis());
                    record.error_message = Some(detail.clone());
                    if let Some(request) = request {
                        record.request_method = Some(request.method.clone());
                        record.request_url = Some(request.url.clone());
                        record.request_headers = serde_json::to_string(&request.headers).ok();
                        record.request_body = request.body;
                    }
                    if let Some(response) = response {
                        record.http_status = Some(response.status as i64);
                        record.response_time_ms = Some(response.elapsed_ms);
                        record.response_body = Some(response.body);
                    }
                    self.exec_repo.update_step_execution(&record).await?;

                    tracing::warn!(
                        "Run {} step {} failed ({:?}): {}",
                        run.id,
                        step.step_order,
                        kind,
                        detail
                    );
                    run.record_failure(step.step_order, &detail);
                    drop(session);
                    self.exec_repo.update_run(&run).await?;
                    return Ok(run);
                }
            }

            let has_next = index + 1 < steps.len();
            if let Some(delay) = step.delay_after().filter(|_| has_next) {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        return self.finish_cancelled(run, session).await;
                    }
                }
            }
        }

        run.complete();
        drop(session);
        self.exec_repo.update_run(&run).await?;
        tracing::info!(
            "Run {} completed: {} succeeded, {} skipped",
            run.id,
            run.successful_steps,
            run.skipped_steps
        );
        Ok(run)
    }

    async fn finish_cancelled(
        &self,
        mut run: PipelineExecution,
        session: RunSession,
    ) -> Result<PipelineExecution> {
        run.cancel();
        drop(session);
        self.exec_repo.update_run(&run).await?;
        tracing::info!(
            "Run {} cancelled after {} of {} steps",
            run.id,
            run.completed_steps,
            run.total_steps
        );
        Ok(run)
    }

    async fn register(&self, run_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.in_flight
            .lock()
            .await
            .insert(run_id.to_string(), token.clone());
        token
    }

    async fn unregister(&self, run_id: &str) {
        self.in_flight.lock().await.remove(run_id);
    }
}
