use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};

use crate::hooks::fetch::DEFAULT_FETCH_TIMEOUT_MS;
use crate::hooks::HookConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub hook_config: HookConfig,
    pub fetch_timeout_ms: u64,
    pub max_request_bytes: Option<usize>,
    /// Answer unknown hook ids with 400 instead of 500.
    pub strict_hook_ids: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hook_config: HookConfig::default(),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            max_request_bytes: None,
            strict_hook_ids: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut hook_config = if let Ok(path) = env::var("SENTIMENT_HOOKS_CONFIG") {
            let content = fs::read_to_string(&path).with_context(|| {
                format!(
                    "Failed to read SENTIMENT_HOOKS_CONFIG '{}': file unreadable",
                    path
                )
            })?;
            serde_json::from_str::<HookConfig>(&content).with_context(|| {
                format!(
                    "Failed to parse SENTIMENT_HOOKS_CONFIG '{}': invalid JSON configuration",
                    path
                )
            })?
        } else {
            HookConfig::default()
        };

        if let Some(default_hook) = env::var("SENTIMENT_DEFAULT_HOOK")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            hook_config.default_hook = Some(default_hook);
        }

        // A zero timeout would fail every fetch immediately.
        let fetch_timeout_ms = parse_nonzero_u64_env("SENTIMENT_FETCH_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
        let max_request_bytes =
            parse_u64_env("SENTIMENT_MAX_REQUEST_BYTES")?.map(|v| v as usize);
        let strict_hook_ids = parse_bool_env("SENTIMENT_STRICT_HOOK_IDS")?.unwrap_or(false);

        Ok(Self {
            hook_config,
            fetch_timeout_ms,
            max_request_bytes,
            strict_hook_ids,
        })
    }
}

/// Trimmed value of `var`; unset and blank both read as `None`.
fn env_value(var: &str) -> Result<Option<String>> {
    match env::var(var) {
        Ok(value) => {
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("{} is not valid unicode: {}", var, err)),
    }
}

fn parse_u64_env(var: &str) -> Result<Option<u64>> {
    env_value(var)?
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| anyhow!("{} must be a non-negative integer, got '{}'", var, raw))
        })
        .transpose()
}

fn parse_nonzero_u64_env(var: &str) -> Result<Option<u64>> {
    match parse_u64_env(var)? {
        Some(0) => Err(anyhow!("{} must be greater than zero", var)),
        other => Ok(other),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    env_value(var)?
        .map(|raw| {
            parse_bool(&raw).ok_or_else(|| {
                anyhow!(
                    "{} must be one of true/false/1/0/yes/no/on/off, got '{}'",
                    var,
                    raw
                )
            })
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
