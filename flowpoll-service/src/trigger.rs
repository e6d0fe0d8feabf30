//! Trigger routes
//!
//! `POST /` starts an execution with `{"marks": <body>}` as input and records
//! it for the caller's session. `GET /` reports progress of the recorded
//! execution. Any other method is rejected.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use fp_core::Error;
use fp_http::axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fp_tracker::SessionKey;
use serde_json::value::RawValue;
use std::time::Instant;
use tracing::instrument;

/// Header selecting the caller's registry slot
pub const SESSION_HEADER: &str = "x-session-id";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(poll_execution)
                .post(start_execution)
                .fallback(invalid_method),
        )
        .with_state(state)
}

fn session_key(headers: &HeaderMap) -> SessionKey {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(SessionKey::new)
        .unwrap_or_default()
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

/// Engine input wrapping the caller's body under `marks`
///
/// The body is checked for JSON syntax and then embedded as sent, so number
/// forms and key order reach the engine untouched. An empty body becomes
/// `marks: null`.
fn marks_input(body: &str) -> Result<String, Error> {
    let body = body.trim();
    if body.is_empty() {
        return Ok("{\"marks\":null}".to_string());
    }
    let marks: Box<RawValue> = serde_json::from_str(body)
        .map_err(|e| Error::invalid_input(format!("marks payload is not valid JSON: {}", e)))?;
    Ok(format!("{{\"marks\":{}}}", marks.get()))
}

fn engine_failure(state: &AppState, session: &SessionKey, error: Error) -> ApiError {
    if error.is_engine_error() {
        state.metrics.engine_error(error.kind());
        state.telemetry.engine_failed(session, &error);
    }
    ApiError::from(error)
}

#[instrument(skip_all)]
async fn start_execution(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<String> {
    let session = session_key(&headers);
    let input = marks_input(&body)?;

    let started = state
        .engine
        .start_execution(&state.state_machine_arn, &input)
        .await
        .map_err(|e| engine_failure(&state, &session, e))?;

    state
        .registry
        .record(&session, started.execution_arn.clone())
        .await;
    state.metrics.execution_started();
    state
        .telemetry
        .execution_started(&session, &started.execution_arn);

    Ok(started.execution_arn.into_inner())
}

#[instrument(skip_all)]
async fn poll_execution(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let session = session_key(&headers);

    let Some(execution_id) = state.registry.current(&session).await else {
        state.metrics.poll_without_execution();
        return Err(Error::MissingExecution.into());
    };

    let started = Instant::now();
    let summary = state
        .projector
        .project(&execution_id)
        .await
        .map_err(|e| engine_failure(&state, &session, e))?;
    let duration_ms = started.elapsed().as_millis() as u64;

    state.metrics.poll_served(duration_ms);
    state
        .telemetry
        .progress_reported(&session, &execution_id, &summary, duration_ms);

    if wants_json(&headers) {
        Ok(Json(summary).into_response())
    } else {
        Ok(summary.render_text().into_response())
    }
}

async fn invalid_method() -> ApiError {
    ApiError::InvalidMethod
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_core::{ExecutionId, ExecutionStatus};
    use fp_engine::MemoryEngine;
    use fp_http::axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use fp_tracker::{ExecutionMetrics, ExecutionRegistry, LatestExecution, ProgressSummary, SessionRegistry};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const STATE_MACHINE: &str = "arn:aws:states:us-east-1:123456789012:stateMachine:Grades";

    struct Harness {
        engine: Arc<MemoryEngine>,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_registry(Arc::new(LatestExecution::new()))
        }

        fn with_registry(registry: Arc<dyn ExecutionRegistry>) -> Self {
            let engine = Arc::new(MemoryEngine::new());
            let metrics = Arc::new(ExecutionMetrics::new().unwrap());
            let state = AppState::new(engine.clone(), registry, metrics, STATE_MACHINE);
            Self { engine, state }
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
            let response = create_router(self.state.clone())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }

        async fn start(&self, body: &str) -> (StatusCode, String) {
            self.send(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }

        async fn poll(&self) -> (StatusCode, String) {
            self.send(Request::builder().method("GET").uri("/").body(Body::empty()).unwrap())
                .await
        }
    }

    #[tokio::test]
    async fn test_poll_before_start_is_client_error() {
        let harness = Harness::new();
        let (status, body) = harness.poll().await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing executionArn");
    }

    #[tokio::test]
    async fn test_start_wraps_marks_and_returns_id() {
        let harness = Harness::new();
        let (status, body) = harness.start("[90, 75, 41]").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("arn:aws:states:local:000000000000:execution:Grades:"));

        let input = harness.engine.input(&ExecutionId::new(body.as_str())).await.unwrap();
        let input: Value = serde_json::from_str(&input).unwrap();
        assert_eq!(input, json!({ "marks": [90, 75, 41] }));
        assert_eq!(harness.state.metrics.executions_started_total(), 1);
    }

    #[tokio::test]
    async fn test_start_with_empty_body_sends_null_marks() {
        let harness = Harness::new();
        let (status, id) = harness.start("").await;
        assert_eq!(status, StatusCode::OK);

        let input = harness.engine.input(&ExecutionId::new(id)).await.unwrap();
        assert_eq!(serde_json::from_str::<Value>(&input).unwrap(), json!({ "marks": null }));
    }

    #[tokio::test]
    async fn test_start_forwards_marks_verbatim() {
        let harness = Harness::new();
        let marks = r#"{"zoe": 90, "adam": 12345678901234567890123, "x": 1e2}"#;
        let (status, id) = harness.start(marks).await;
        assert_eq!(status, StatusCode::OK);

        let input = harness.engine.input(&ExecutionId::new(id)).await.unwrap();
        assert_eq!(input, format!("{{\"marks\":{}}}", marks));
    }

    #[test]
    fn test_marks_input_trims_surrounding_whitespace() {
        assert_eq!(marks_input("  [1, 2]\n").unwrap(), "{\"marks\":[1, 2]}");
        assert_eq!(marks_input(" \n ").unwrap(), "{\"marks\":null}");
        assert!(marks_input("[1, 2] trailing").is_err());
    }

    #[tokio::test]
    async fn test_start_rejects_malformed_marks() {
        let harness = Harness::new();
        let (status, body) = harness.start("[90, 75").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Invalid input"));
        assert_eq!(harness.engine.execution_count().await, 0);
    }

    #[tokio::test]
    async fn test_poll_running_execution() {
        let harness = Harness::new();
        let (_, id) = harness.start("{\"alice\": 90}").await;
        let id = ExecutionId::new(id);
        harness.engine.enter_state(&id, "Validate").await.unwrap();
        harness.engine.enter_state(&id, "Grade").await.unwrap();

        let (status, body) = harness.poll().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "Passed States: ExecutionStarted, Validate, Grade\n\
             Current State: Grade\n\
             Execution Status: RUNNING\n\
             Execution Result: null"
        );
    }

    #[tokio::test]
    async fn test_poll_succeeded_execution() {
        let harness = Harness::new();
        let (_, id) = harness.start("[1]").await;
        let id = ExecutionId::new(id);
        harness.engine.enter_state(&id, "Grade").await.unwrap();
        harness.engine.succeed(&id, "{\"grade\":\"A\"}").await.unwrap();

        let (status, body) = harness.poll().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "Passed States: ExecutionStarted, Grade, ExecutionSucceeded\n\
             Current State: ExecutionSucceeded\n\
             Execution Status: SUCCEEDED\n\
             Execution Result: {\"grade\":\"A\"}"
        );
    }

    #[tokio::test]
    async fn test_poll_failed_execution_leads_with_error() {
        let harness = Harness::new();
        let (_, id) = harness.start("[1]").await;
        let id = ExecutionId::new(id);
        harness.engine.enter_state(&id, "A").await.unwrap();
        harness.engine.fail(&id, "States.TaskFailed", "boom").await.unwrap();
        harness.engine.enter_state(&id, "B").await.unwrap();

        let (status, body) = harness.poll().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "Execution Error: boom\n\n\
             Passed States: ExecutionStarted, A, ExecutionFailed\n\
             Current State: ExecutionFailed\n\
             Execution Status: FAILED\n\
             Execution Result: null"
        );
    }

    #[tokio::test]
    async fn test_second_start_replaces_first() {
        let harness = Harness::new();
        let (_, first) = harness.start("[1]").await;
        let (_, second) = harness.start("[2]").await;
        assert_ne!(first, second);

        harness
            .engine
            .enter_state(&ExecutionId::new(first.as_str()), "OnlyInFirst")
            .await
            .unwrap();

        let (_, body) = harness.poll().await;
        assert!(body.starts_with("Passed States: ExecutionStarted\n"));
        assert!(!body.contains("OnlyInFirst"));
        assert_eq!(
            harness.state.registry.current(&SessionKey::default()).await,
            Some(ExecutionId::new(second))
        );
    }

    #[tokio::test]
    async fn test_other_methods_are_rejected() {
        let harness = Harness::new();
        for method in ["PUT", "DELETE", "PATCH"] {
            let (status, body) = harness
                .send(Request::builder().method(method).uri("/").body(Body::empty()).unwrap())
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
            assert_eq!(body, "Invalid HTTP method");
        }
    }

    #[tokio::test]
    async fn test_json_summary_on_request() {
        let harness = Harness::new();
        let (_, id) = harness.start("[1]").await;
        harness.engine.enter_state(&ExecutionId::new(id), "Grade").await.unwrap();

        let (status, body) = harness
            .send(
                Request::builder()
                    .method("GET")
                    .uri("/")
                    .header("accept", "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let summary: ProgressSummary = serde_json::from_str(&body).unwrap();
        assert_eq!(summary.current_state.as_deref(), Some("Grade"));
        assert_eq!(summary.status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_sessions_poll_their_own_execution() {
        let harness = Harness::with_registry(Arc::new(SessionRegistry::new()));

        let start_as = |session: &'static str, body: &'static str| {
            Request::builder()
                .method("POST")
                .uri("/")
                .header(SESSION_HEADER, session)
                .body(Body::from(body))
                .unwrap()
        };
        let poll_as = |session: &'static str| {
            Request::builder()
                .method("GET")
                .uri("/")
                .header(SESSION_HEADER, session)
                .body(Body::empty())
                .unwrap()
        };

        let (_, alice_id) = harness.send(start_as("alice", "[1]")).await;
        let (_, _bob_id) = harness.send(start_as("bob", "[2]")).await;
        harness
            .engine
            .enter_state(&ExecutionId::new(alice_id), "AliceOnly")
            .await
            .unwrap();

        let (_, alice_body) = harness.send(poll_as("alice")).await;
        let (_, bob_body) = harness.send(poll_as("bob")).await;
        let (carol_status, _) = harness.send(poll_as("carol")).await;

        assert!(alice_body.contains("AliceOnly"));
        assert!(!bob_body.contains("AliceOnly"));
        assert_eq!(carol_status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_execution_is_not_found() {
        let harness = Harness::new();
        harness
            .state
            .registry
            .record(&SessionKey::default(), ExecutionId::new("arn:gone"))
            .await;

        let (status, body) = harness.poll().await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("arn:gone"));
        assert_eq!(
            harness.state.metrics.engine_errors_total("unknown_execution"),
            1
        );
    }

    #[tokio::test]
    async fn test_engine_status_passes_through() {
        let harness = Harness::new();
        let (_, id) = harness.start("[1]").await;
        harness
            .engine
            .set_status(&ExecutionId::new(id), ExecutionStatus::Other("PAUSED".into()))
            .await
            .unwrap();

        let (_, body) = harness.poll().await;
        assert!(body.contains("Execution Status: PAUSED"));
    }

    #[test]
    fn test_session_key_defaults() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_key(&headers), SessionKey::default());

        headers.insert(SESSION_HEADER, "  ".parse().unwrap());
        assert_eq!(session_key(&headers), SessionKey::default());

        headers.insert(SESSION_HEADER, "alice".parse().unwrap());
        assert_eq!(session_key(&headers), SessionKey::new("alice"));
    }
}
