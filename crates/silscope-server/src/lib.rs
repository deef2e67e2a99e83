//! HTTP surface of the silscope compilation inspector.
//!
//! | method | path | body |
//! |---|---|---|
//! | `POST` | `/api/compile` | [`CompileRequest`] → `{"results": {...}}` |
//! | `GET` | `/api/stages` | stage catalog |
//! | `GET` | `/api/health` | `{"status": "ok"}` |

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value as JsonValue;
use silscope_core::{CompileRequest, CompileResponse, Component, StageKey, log_error};
use silscope_runtime::{Orchestrator, OrchestratorError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Worst-case JSON growth of one source byte (a control character becomes
/// `\u00XX`).
const JSON_ESCAPE_FACTOR: usize = 6;

/// Room for the option fields and JSON framing around the source.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest request body accepted for sources of up to `max_source_bytes`.
///
/// Any source that passes validation fits, however it is escaped, so
/// oversized sources are rejected by validation with a 400 rather than by
/// the framework.
pub fn body_limit(max_source_bytes: usize) -> usize {
    max_source_bytes
        .saturating_mul(JSON_ESCAPE_FACTOR)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = body_limit(state.orchestrator.settings().max_source_bytes);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/stages", get(stages))
        .route("/api/compile", post(compile))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn health() -> Json<JsonValue> {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub key: StageKey,
    pub label: &'static str,
    pub demangle_eligible: bool,
    pub optimization_affected: bool,
}

pub async fn stages(State(state): State<AppState>) -> Json<Vec<StageInfo>> {
    let stages = state
        .orchestrator
        .catalog()
        .stages()
        .iter()
        .map(|spec| StageInfo {
            key: spec.key,
            label: spec.label,
            demangle_eligible: spec.demangle_eligible,
            optimization_affected: spec.optimization_affected,
        })
        .collect();
    Json(stages)
}

pub async fn compile(
    State(state): State<AppState>,
    Json(req): Json<CompileRequest>,
) -> Result<Json<CompileResponse>, ApiError> {
    let response = state
        .orchestrator
        .compile(&req)
        .await
        .map_err(ApiError::orchestrator)?;
    Ok(Json(response))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn orchestrator(error: OrchestratorError) -> Self {
        if error.is_client_error() {
            return Self::bad_request(error.to_string());
        }
        log_error!(Component::Server, %error, "compile request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(serde_json::json!({
            "error": self.message
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use silscope_core::{CompileOptions, StageCatalog, Toolchain};
    use silscope_runtime::testing::{Scripted, ScriptedRunner, swift_like};
    use silscope_runtime::{AdmissionGate, Demangler, Invocation, OrchestratorSettings};

    use super::*;

    fn state_with(runner: Arc<ScriptedRunner>, scratch: &tempfile::TempDir) -> AppState {
        let demangler = Demangler::new(
            "swift-demangle",
            Vec::new(),
            Duration::from_secs(5),
            runner.clone(),
        );
        let orchestrator = Orchestrator::new(
            StageCatalog::new(Toolchain::default()),
            runner,
            AdmissionGate::new(4),
            demangler,
            OrchestratorSettings {
                scratch_root: Some(scratch.path().to_path_buf()),
                ..OrchestratorSettings::default()
            },
        );
        AppState::new(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn compile_returns_every_stage_key() {
        let scratch = tempfile::tempdir().unwrap();
        let state = state_with(Arc::new(ScriptedRunner::new(swift_like)), &scratch);
        let request = CompileRequest::new("print(1)", CompileOptions::default());

        let Json(response) = compile(State(state), Json(request)).await.unwrap();
        let body = serde_json::to_value(&response).unwrap();
        let results = body["results"].as_object().unwrap();
        let keys: Vec<_> = results.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["silRaw", "silCanonical", "ast", "parse", "ir", "assembly"]
        );
        for result in results.values() {
            assert_eq!(result["exitCode"], 0);
            assert!(result["label"].is_string());
            assert!(result["command"].is_array());
            assert!(result["output"].is_string());
        }
    }

    #[tokio::test]
    async fn compile_reports_stage_failures_inside_the_response() {
        let scratch = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(|_: &Invocation| Scripted::LaunchFailure));
        let state = state_with(runner, &scratch);
        let request = CompileRequest::new("print(1)", CompileOptions::default());

        let Json(response) = compile(State(state), Json(request)).await.unwrap();
        assert_eq!(response.len(), 6);
        assert!(!response.all_succeeded());
    }

    #[tokio::test]
    async fn empty_source_is_a_bad_request() {
        let scratch = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(swift_like));
        let state = state_with(runner.clone(), &scratch);
        let request = CompileRequest::new("   ", CompileOptions::default());

        let error = compile(State(state), Json(request)).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.message(), "Source is required");
        assert_eq!(runner.call_count(), 0);

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stages_lists_catalog() {
        let scratch = tempfile::tempdir().unwrap();
        let state = state_with(Arc::new(ScriptedRunner::new(swift_like)), &scratch);
        let Json(stages) = stages(State(state)).await;
        assert_eq!(stages.len(), 6);
        let parse = stages.iter().find(|s| s.key == StageKey::Parse).unwrap();
        assert!(!parse.demangle_eligible);
        assert!(!parse.optimization_affected);

        let json = serde_json::to_value(&stages[1]).unwrap();
        assert_eq!(json["key"], "silCanonical");
        assert_eq!(json["demangleEligible"], true);
        assert_eq!(json["optimizationAffected"], true);
    }

    #[test]
    fn body_limit_fits_fully_escaped_sources() {
        let max_source_bytes = 4096;
        let request = CompileRequest::new(
            "\u{1}".repeat(max_source_bytes),
            CompileOptions::default()
                .with_demangle(true)
                .with_optimize(true)
                .with_whole_module_optimization(true)
                .with_parse_as_library(true),
        );
        let body = serde_json::to_vec(&request).unwrap();
        assert!(body.len() > 2 * max_source_bytes);
        assert!(body.len() <= body_limit(max_source_bytes));
    }

    #[test]
    fn body_limit_saturates() {
        assert_eq!(body_limit(usize::MAX), usize::MAX);
    }

    #[tokio::test]
    async fn router_builds_with_state() {
        let scratch = tempfile::tempdir().unwrap();
        let state = state_with(Arc::new(ScriptedRunner::new(swift_like)), &scratch);
        let _router = router(state);
    }
}
