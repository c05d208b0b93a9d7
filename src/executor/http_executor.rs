use super::session::RunSession;
use super::{extractor, template};
use crate::models::{Context, Step};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::collections::BTreeMap;
use std::time::Instant;

/// The request exactly as it was sent, after template resolution.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub body: String,
    pub elapsed_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The step's call template could not be turned into a request.
    Definition,
    /// The request never produced a complete response.
    Transport,
    /// The server answered with a status of 400 or above.
    HttpStatus,
}

#[derive(Debug)]
pub enum StepOutcome {
    Success {
        request: RequestSnapshot,
        response: ResponseSnapshot,
        extracted: Context,
    },
    Failure {
        kind: FailureKind,
        detail: String,
        request: Option<RequestSnapshot>,
        response: Option<ResponseSnapshot>,
    },
}

impl StepOutcome {
    fn definition_error(detail: String) -> Self {
        Self::Failure {
            kind: FailureKind::Definition,
            detail,
            request: None,
            response: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct HttpStepExecutor;

impl HttpStepExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Sends the step's request through `session` and, when the server
    /// accepts it, extracts the variables for the next step.
    pub async fn execute(&self, step: &Step, context: &Context, session: &RunSession) -> StepOutcome {
        let (request, headers) = match build_request(step, context) {
            Ok(built) => built,
            Err(detail) => return StepOutcome::definition_error(detail),
        };

        tracing::debug!(
            "Run {} step {}: {} {}",
            session.run_id(),
            step.step_order,
            request.method,
            request.url
        );

        let method = match Method::from_bytes(request.method.as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return StepOutcome::definition_error(format!(
                    "Invalid HTTP method: {}",
                    request.method
                ));
            }
        };

        let mut builder = session
            .client()
            .request(method, request.url.as_str())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                return StepOutcome::Failure {
                    kind: FailureKind::Transport,
                    detail: describe_transport_error(&e),
                    request: Some(request),
                    response: None,
                };
            }
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return StepOutcome::Failure {
                    kind: FailureKind::Transport,
                    detail: format!("Failed to read response body: {}", e),
                    request: Some(request),
                    response: None,
                };
            }
        };
        let response = ResponseSnapshot {
            status: status.as_u16(),
            body,
            elapsed_ms: started.elapsed().as_millis() as i64,
        };

        if status.as_u16() >= 400 {
            return StepOutcome::Failure {
                kind: FailureKind::HttpStatus,
                detail: format!("HTTP {}", status),
                request: Some(request),
                response: Some(response),
            };
        }

        let extracted = step
            .extraction_spec()
            .map(|spec| extractor::extract(spec, &response.body))
            .unwrap_or_default();

        StepOutcome::Success {
            request,
            response,
            extracted,
        }
    }
}

fn build_request(step: &Step, context: &Context) -> Result<(RequestSnapshot, HeaderMap), String> {
    let call = &step.call;
    let method = template::resolve(&call.method, context).trim().to_uppercase();
    let bodiless = is_bodiless(&method);

    let raw_url = template::resolve(&call.url, context);
    let mut url = Url::parse(raw_url.trim())
        .map_err(|e| format!("Invalid URL '{}': {}", raw_url.trim(), e))?;

    if bodiless {
        let params = parse_template_map(call.query_params.as_deref(), "query parameter")?;
        let resolved: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (key.clone(), template::resolve(value, context).into_owned()))
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        if !resolved.is_empty() {
            url.query_pairs_mut().extend_pairs(resolved);
        }
    }

    let mut headers: BTreeMap<String, String> = parse_template_map(call.headers.as_deref(), "header")?
        .iter()
        .map(|(key, value)| (key.clone(), template::resolve(value, context).into_owned()))
        .collect();

    let body = call
        .body
        .as_deref()
        .filter(|body| !body.trim().is_empty())
        .map(|body| template::resolve(body, context).into_owned());

    let has_content_type = headers
        .keys()
        .any(|key| key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
    if !has_content_type {
        if let Some(body) = &body {
            headers.insert("Content-Type".to_string(), sniff_content_type(body).to_string());
        }
    }

    let mut header_map = HeaderMap::new();
    for (key, value) in &headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| format!("Invalid header name: {}", key))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| format!("Invalid value for header {}", key))?;
        header_map.insert(name, value);
    }

    let request = RequestSnapshot {
        method,
        url: url.to_string(),
        headers,
        body: if bodiless { None } else { body },
    };
    Ok((request, header_map))
}

fn parse_template_map(raw: Option<&str>, what: &str) -> Result<BTreeMap<String, String>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(BTreeMap::new());
    };
    serde_json::from_str(raw).map_err(|e| format!("Invalid {} template: {}", what, e))
}

/// Methods that never carry a request body.
pub fn is_bodiless(method: &str) -> bool {
    matches!(method, "GET" | "HEAD" | "OPTIONS")
}

pub fn sniff_content_type(body: &str) -> &'static str {
    if serde_json::from_str::<serde_json::Value>(body).is_ok() {
        "application/json"
    } else {
        "text/plain"
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timed out: {}", error)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        format!("Request failed: {}", error)
    }
}
