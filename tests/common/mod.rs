//! Shared fixtures: a throwaway SQLite database and a local HTTP target the
//! pipelines call into.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, RawQuery, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use pipeline_runner::executor::SessionManager;
use pipeline_runner::models::{ApiCall, PipelineExecution};
use pipeline_runner::repository::pipeline_repository::NewStep;
use pipeline_runner::repository::{ExecutionRepository, PipelineRepository, establish_connection};
use pipeline_runner::services::RunService;

#[derive(Clone, Default)]
struct TargetState {
    sessions_issued: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<String>>>,
}

/// HTTP server the test pipelines talk to.
pub struct TargetServer {
    pub addr: SocketAddr,
    state: TargetState,
    _handle: JoinHandle<()>,
}

impl TargetServer {
    pub async fn start() -> Self {
        let state = TargetState::default();
        let app = Router::new()
            .route("/login", post(login))
            .route("/whoami", get(whoami))
            .route("/items/{id}", get(item))
            .route("/echo", post(echo))
            .route("/fail", get(fail))
            .route("/slow", get(slow))
            .route("/after", get(after))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind target server");
        let addr = listener.local_addr().expect("target address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// `METHOD /path` of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn record(State(state): State<TargetState>, req: Request, next: Next) -> Response {
    state
        .requests
        .lock()
        .unwrap()
        .push(format!("{} {}", req.method(), req.uri().path()));
    next.run(req).await
}

async fn login(State(state): State<TargetState>) -> impl IntoResponse {
    let n = state.sessions_issued.fetch_add(1, Ordering::SeqCst) + 1;
    let session = format!("s-{}", n);
    (
        [(header::SET_COOKIE, format!("session={}; Path=/", session))],
        Json(json!({
            "token": format!("tok-{}", n),
            "session": session,
            "user": {"id": 7, "name": "ada", "roles": ["admin"]}
        })),
    )
}

async fn whoami(headers: HeaderMap) -> Response {
    match headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        Some(cookie) => Json(json!({ "cookie": cookie })).into_response(),
        None => (StatusCode::UNAUTHORIZED, "no session").into_response(),
    }
}

async fn item(Path(id): Path<String>, RawQuery(query): RawQuery, headers: HeaderMap) -> Json<serde_json::Value> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({
        "id": id,
        "query": query,
        "authorization": authorization
    }))
}

async fn echo(headers: HeaderMap, body: String) -> Json<serde_json::Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({ "body": body, "content_type": content_type }))
}

async fn fail() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn after() -> Json<serde_json::Value> {
    Json(json!({ "reached": true }))
}

/// One step to seed, with its call template inline.
pub struct SeedStep {
    pub call: ApiCall,
    pub extractions: Option<String>,
    pub delay_after_ms: i64,
    pub skip: bool,
    pub active: bool,
}

impl SeedStep {
    pub fn new(method: &str, url: String) -> Self {
        Self {
            call: ApiCall {
                method: method.to_string(),
                url,
                ..ApiCall::default()
            },
            extractions: None,
            delay_after_ms: 0,
            skip: false,
            active: true,
        }
    }

    pub fn headers(mut self, headers: &str) -> Self {
        self.call.headers = Some(headers.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.call.body = Some(body.to_string());
        self
    }

    pub fn query(mut self, query: &str) -> Self {
        self.call.query_params = Some(query.to_string());
        self
    }

    pub fn extract(mut self, spec: &str) -> Self {
        self.extractions = Some(spec.to_string());
        self
    }

    pub fn delay_ms(mut self, delay: i64) -> Self {
        self.delay_after_ms = delay;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

pub struct Harness {
    pub pipelines: PipelineRepository,
    pub executions: ExecutionRepository,
    pub service: RunService,
    pub target: TargetServer,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_step_timeout(Duration::from_secs(10)).await
    }

    pub async fn with_step_timeout(step_timeout: Duration) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let url = format!("sqlite:{}", dir.path().join("runs.db").display());
        let pool = establish_connection(&url).await.expect("open database");

        let pipelines = PipelineRepository::new(pool.clone());
        let executions = ExecutionRepository::new(pool);
        let service = RunService::new(
            pipelines.clone(),
            executions.clone(),
            SessionManager::new(step_timeout),
            20,
        );

        Self {
            pipelines,
            executions,
            service,
            target: TargetServer::start().await,
            _dir: dir,
        }
    }

    /// Stores a pipeline whose steps are numbered in the given order.
    pub async fn seed(&self, steps: Vec<SeedStep>) -> String {
        let pipeline = self
            .pipelines
            .create_pipeline("test pipeline", None)
            .await
            .expect("create pipeline");

        for (index, step) in steps.into_iter().enumerate() {
            let order = index as i64 + 1;
            let call_id = self
                .pipelines
                .create_api_call(&format!("call {}", order), &step.call)
                .await
                .expect("create api call");
            self.pipelines
                .create_step(
                    &pipeline.id,
                    &NewStep {
                        step_order: order,
                        name: format!("step {}", order),
                        description: None,
                        api_call_id: call_id,
                        data_extractions: step.extractions,
                        delay_after_ms: step.delay_after_ms,
                        skip: step.skip,
                        active: step.active,
                    },
                )
                .await
                .expect("create step");
        }

        pipeline.id
    }

    /// Polls until the run reaches a terminal status.
    pub async fn wait_for_terminal(&self, run_id: &str) -> PipelineExecution {
        for _ in 0..200 {
            let run = self.executions.get_run(run_id).await.expect("get run");
            if run.is_terminal() {
                return run;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("run {} did not finish", run_id);
    }
}
