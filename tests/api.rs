mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{Harness, SeedStep};
use pipeline_runner::api::create_router;
use serde_json::Value;
use tower::ServiceExt;

async fn call(h: &Harness, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = create_router(h.service.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new().await;
    let (status, body) = call(&h, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = Harness::new().await;

    let (status, body) = call(&h, "POST", "/api/pipelines/nope/runs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Pipeline 'nope' not found");

    let (status, _) = call(&h, "GET", "/api/runs/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&h, "GET", "/api/runs/nope/steps").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pipeline_without_steps_is_unprocessable() {
    let h = Harness::new().await;
    let pipeline_id = h
        .seed(vec![SeedStep::new("GET", h.target.url("/after")).inactive()])
        .await;

    let (status, _) = call(&h, "POST", &format!("/api/pipelines/{}/runs", pipeline_id)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn run_can_be_started_and_inspected() {
    let h = Harness::new().await;
    let pipeline_id = h
        .seed(vec![
            SeedStep::new("POST", h.target.url("/login")).extract(r#"{"token": "token"}"#),
            SeedStep::new("GET", h.target.url("/fail")),
        ])
        .await;

    let (status, body) = call(&h, "POST", &format!("/api/pipelines/{}/runs", pipeline_id)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["total_steps"], 2);
    let run_id = body["id"].as_str().unwrap().to_string();

    h.wait_for_terminal(&run_id).await;

    let (status, run) = call(&h, "GET", &format!("/api/runs/{}", run_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["status"], "FAILED");
    assert_eq!(run["error_message"], "Step 2 failed: HTTP 500 Internal Server Error");
    assert!(run["completed_at"].is_string());

    let (_, steps) = call(&h, "GET", &format!("/api/runs/{}/steps", run_id)).await;
    let steps = steps["data"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["status"], "SUCCESS");
    assert_eq!(steps[0]["extracted_data"]["token"], "tok-1");
    assert_eq!(steps[1]["status"], "FAILED");
    assert_eq!(steps[1]["http_status"], 500);

    let (_, runs) = call(&h, "GET", &format!("/api/pipelines/{}/runs", pipeline_id)).await;
    assert_eq!(runs["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(&h, "PUT", &format!("/api/runs/{}/stop", run_id)).await;
    assert_eq!(status, StatusCode::OK);
}
