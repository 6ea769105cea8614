//! Core library for the sentiment service.  This module wires together the
//! hook pipeline, request/response structures and HTTP handlers.
//!
//! Two entry points score text: `POST /analyze` scores inline text, and
//! `POST /task` fetches text from a configured hook first.  `GET /` reports
//! liveness plus the success counters of both.

mod config;
pub mod hooks;
pub mod sentiment;
pub mod task;

pub use config::AppConfig;

use axum::extract::{
    rejection::{BytesRejection, FailedToBufferBody, JsonRejection},
    DefaultBodyLimit, State,
};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tower_http::trace::TraceLayer;

use crate::hooks::fetch::HttpFetcher;
use crate::hooks::HookRegistry;
use crate::sentiment::{LexiconScorer, Scorer};
use crate::task::{TaskError, TaskRequest, TaskRunner};

pub use crate::hooks::merge::TaskPayload;
pub use crate::sentiment::Analysis;

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: i32,
    pub message: String,
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub total_successful_analyses: u64,
    pub hooked_requests: u64,
}

/// Internal application state shared across handlers.  Everything here is
/// either immutable after startup or an atomic counter.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskRunner,
    pub scorer: Arc<dyn Scorer>,
    /// Maximum accepted raw request body size in bytes (None => axum default)
    pub max_request_bytes: Option<usize>,
    /// Unknown hook ids answer 400 instead of 500
    pub strict_hook_ids: bool,
    // Success counters, monotonic for the process lifetime
    pub metric_analyses_total: Arc<AtomicU64>,
    pub metric_hooked_total: Arc<AtomicU64>,
}

/// Build state from an explicit configuration.  Hook definitions are
/// validated here; an invalid hook aborts startup.
pub fn build_state(config: AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let AppConfig {
        hook_config,
        fetch_timeout_ms,
        max_request_bytes,
        strict_hook_ids,
    } = config;

    let registry = HookRegistry::from_config(&hook_config)?;
    if registry.is_empty() {
        tracing::warn!("No hooks registered: SENTIMENT_HOOKS_CONFIG not set or empty");
    } else {
        tracing::info!(
            hooks = registry.len(),
            default_hook = ?registry.default_hook(),
            "hook registry loaded"
        );
    }
    let fetcher = HttpFetcher::new(fetch_timeout_ms)?;
    let scorer: Arc<dyn Scorer> = Arc::new(LexiconScorer);
    let tasks = TaskRunner::new(Arc::new(registry), Arc::new(fetcher), scorer.clone());

    Ok(AppState {
        tasks,
        scorer,
        max_request_bytes,
        strict_hook_ids,
        metric_analyses_total: Arc::new(AtomicU64::new(0)),
        metric_hooked_total: Arc::new(AtomicU64::new(0)),
    })
}

/// Build state from environment variables.  This function reads the
/// following variables:
///
/// * `SENTIMENT_HOOKS_CONFIG` (optional) – path to a JSON hook file.
/// * `SENTIMENT_DEFAULT_HOOK` (optional) – overrides the file's default hook.
/// * `SENTIMENT_FETCH_TIMEOUT_MS` (optional) – outbound fetch timeout.
/// * `SENTIMENT_MAX_REQUEST_BYTES` (optional) – inbound body cap.
/// * `SENTIMENT_STRICT_HOOK_IDS` (optional) – unknown hook ids answer 400.
pub async fn build_state_from_env() -> Result<AppState, Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;
    build_state(config)
}

/// Build the Axum router and attach handlers.  The router holds a copy
/// of the `AppState` for each invocation.
pub fn app(state: AppState) -> Router {
    let max_request_bytes = state.max_request_bytes;

    let router = Router::new()
        .route("/", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .route("/task", post(task_handler));

    let router = if let Some(limit) = max_request_bytes {
        router.layer(DefaultBodyLimit::max(limit))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn respond_with_error(err: ErrorResponse) -> axum::response::Response {
    let status = StatusCode::from_u16(err.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err)).into_response()
}

fn missing_field(field: &str) -> ErrorResponse {
    ErrorResponse {
        error_code: 4002,
        message: format!("Missing or empty required field: {}", field),
        http_status: 400,
        diagnostics: None,
    }
}

/// Map a pipeline failure onto the HTTP error body.  The message names the
/// hook and stage; the underlying error chain only goes to the log.
fn task_error_response(err: &TaskError, strict_hook_ids: bool) -> ErrorResponse {
    let stage = err.stage().as_str();
    let mut diagnostics = serde_json::json!({ "hook": err.hook(), "stage": stage });
    let (error_code, http_status, message) = match err {
        // Without an id the fault is a missing default hook, which stays 500.
        TaskError::HookNotFound { hook: Some(_) } if strict_hook_ids => {
            (4040, 400, err.to_string())
        }
        TaskError::HookNotFound { .. } => (5001, 500, err.to_string()),
        TaskError::FetchFailed { hook, source } => {
            let message = match source.status() {
                Some(status) => {
                    diagnostics["upstreamStatus"] = status.into();
                    format!("Hook '{}' answered with status {}", hook, status)
                }
                None => format!("Could not fetch record from hook '{}'", hook),
            };
            (5002, 500, message)
        }
        TaskError::DecodeFailed { .. } => (5003, 500, err.to_string()),
        TaskError::ShapeInvalid { .. } => (5004, 500, err.to_string()),
    };
    ErrorResponse {
        error_code,
        message,
        http_status,
        diagnostics: Some(diagnostics),
    }
}

/// Handler for `/analyze`.  Scores the supplied text directly.
async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> axum::response::Response {
    let payload = match payload {
        Ok(Json(inner)) => inner,
        Err(rejection) => {
            return handle_json_rejection(&state, rejection);
        }
    };
    let text = match payload.text.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(text) => text,
        None => return respond_with_error(missing_field("text")),
    };

    let analysis = state.scorer.analyze(text);
    state.metric_analyses_total.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(words = analysis.words.len(), score = analysis.score, "analyzed");
    (StatusCode::OK, Json(analysis)).into_response()
}

/// Handler for `/task`.  Resolves the hook, fetches the record and scores it.
async fn task_handler(
    State(state): State<AppState>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> axum::response::Response {
    let payload = match payload {
        Ok(Json(inner)) => inner,
        Err(rejection) => {
            return handle_json_rejection(&state, rejection);
        }
    };
    if payload.record_id.trim().is_empty() {
        return respond_with_error(missing_field("recordingId"));
    }

    match state.tasks.run(&payload).await {
        Ok(result) => {
            state.metric_hooked_total.fetch_add(1, Ordering::Relaxed);
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            tracing::warn!(
                hook = ?err.hook(),
                stage = err.stage().as_str(),
                error = %err,
                cause = ?std::error::Error::source(&err).map(|s| s.to_string()),
                "task failed"
            );
            respond_with_error(task_error_response(&err, state.strict_hook_ids))
        }
    }
}

fn handle_json_rejection(state: &AppState, rejection: JsonRejection) -> axum::response::Response {
    match rejection {
        JsonRejection::BytesRejection(BytesRejection::FailedToBufferBody(
            FailedToBufferBody::LengthLimitError(_),
        )) => {
            if let Some(limit) = state.max_request_bytes {
                tracing::warn!(limit, "request body exceeded configured limit");
            } else {
                tracing::warn!("request body exceeded limit but no max_request_bytes configured");
            }
            let message = match state.max_request_bytes {
                Some(limit) => format!("Request too large (body exceeded limit {} bytes)", limit),
                None => "Request too large".to_string(),
            };
            respond_with_error(ErrorResponse {
                error_code: 4001,
                message,
                http_status: 413,
                diagnostics: None,
            })
        }
        other => {
            tracing::debug!(error = %other.body_text(), "rejected request body");
            respond_with_error(ErrorResponse {
                error_code: 4000,
                message: format!("Request body must be a valid JSON object: {}", other.body_text()),
                http_status: 400,
                diagnostics: None,
            })
        }
    }
}

/// Liveness probe with the process-lifetime success counters.
async fn health_handler(State(state): State<AppState>) -> axum::response::Response {
    let health = HealthResponse {
        status: "Up".to_string(),
        total_successful_analyses: state.metric_analyses_total.load(Ordering::Relaxed),
        hooked_requests: state.metric_hooked_total.load(Ordering::Relaxed),
    };
    (StatusCode::OK, Json(health)).into_response()
}
