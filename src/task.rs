//! Task orchestration: resolve hook, fetch, interpret, merge.
//!
//! Each run is independent.  There are no retries between stages and any
//! failure is terminal for the task that hit it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hooks::fetch::{FetchError, Fetcher};
use crate::hooks::interpret::{interpret, InterpretError};
use crate::hooks::merge::{merge, TaskPayload};
use crate::hooks::HookRegistry;
use crate::sentiment::Scorer;

/// Body of `POST /task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    #[serde(rename = "recordingId")]
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,
}

/// Pipeline stage a task failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    HookResolution,
    Fetch,
    Decode,
    Shape,
}

impl TaskStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStage::HookResolution => "hook_resolution",
            TaskStage::Fetch => "fetch",
            TaskStage::Decode => "decode",
            TaskStage::Shape => "shape",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// `hook` is `None` when no id was given and no default is configured.
    #[error("{}", missing_hook_message(.hook))]
    HookNotFound { hook: Option<String> },
    #[error("fetching from hook '{hook}' failed")]
    FetchFailed {
        hook: String,
        #[source]
        source: FetchError,
    },
    #[error("hook '{hook}' returned a body that is not valid JSON")]
    DecodeFailed {
        hook: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("hook '{hook}' returned JSON of an unexpected shape: {detail}")]
    ShapeInvalid {
        hook: String,
        detail: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

fn missing_hook_message(hook: &Option<String>) -> String {
    match hook {
        Some(id) => format!("hook '{}' is not registered", id),
        None => "no default hook configured".to_string(),
    }
}

impl TaskError {
    pub fn stage(&self) -> TaskStage {
        match self {
            TaskError::HookNotFound { .. } => TaskStage::HookResolution,
            TaskError::FetchFailed { .. } => TaskStage::Fetch,
            TaskError::DecodeFailed { .. } => TaskStage::Decode,
            TaskError::ShapeInvalid { .. } => TaskStage::Shape,
        }
    }

    pub fn hook(&self) -> Option<&str> {
        match self {
            TaskError::HookNotFound { hook } => hook.as_deref(),
            TaskError::FetchFailed { hook, .. }
            | TaskError::DecodeFailed { hook, .. }
            | TaskError::ShapeInvalid { hook, .. } => Some(hook),
        }
    }
}

/// Composes the hook pipeline.  Cheap to clone; all parts are shared.
#[derive(Clone)]
pub struct TaskRunner {
    registry: Arc<HookRegistry>,
    fetcher: Arc<dyn Fetcher>,
    scorer: Arc<dyn Scorer>,
}

impl TaskRunner {
    pub fn new(
        registry: Arc<HookRegistry>,
        fetcher: Arc<dyn Fetcher>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            scorer,
        }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub async fn run(&self, req: &TaskRequest) -> Result<TaskPayload, TaskError> {
        let hook = self
            .registry
            .lookup(req.hook_id.as_deref())
            .ok_or_else(|| TaskError::HookNotFound {
                hook: req.hook_id.clone(),
            })?;
        tracing::debug!(hook = %hook.id, mode = hook.mode.as_str(), "hook resolved");

        let url = hook.url.render(&req.record_id);
        let fetched = self
            .fetcher
            .fetch(&url, &hook.headers)
            .await
            .map_err(|source| TaskError::FetchFailed {
                hook: hook.id.clone(),
                source,
            })?;
        tracing::debug!(hook = %hook.id, status = fetched.status, bytes = fetched.body.len(), "fetched");

        let content = interpret(hook, fetched.body).map_err(|err| match err {
            InterpretError::Decode(source) => TaskError::DecodeFailed {
                hook: hook.id.clone(),
                source,
            },
            InterpretError::Shape { detail, source } => TaskError::ShapeInvalid {
                hook: hook.id.clone(),
                detail,
                source,
            },
        })?;
        tracing::debug!(hook = %hook.id, "interpreted");

        Ok(merge(content, self.scorer.as_ref()))
    }
}
