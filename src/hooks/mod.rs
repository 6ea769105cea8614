//! Hook infrastructure.
//!
//! A hook is a caller-registered remote source of text.  Hooks are declared
//! in a JSON file, validated once at startup and collected into an immutable
//! [`HookRegistry`] that request handlers share without locking.

use std::collections::{BTreeMap, HashMap};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub mod fetch;
pub mod interpret;
pub mod merge;
pub mod template;

use self::template::{TemplateError, UrlTemplate};

/// Hook file layout as loaded from `SENTIMENT_HOOKS_CONFIG`.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfig {
    /// Hook used when a task request carries no `hookId`.
    #[serde(default)]
    pub default_hook: Option<String>,
    #[serde(default)]
    pub hooks: BTreeMap<String, HookDefinition>,
}

/// Raw, unvalidated hook declaration.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct HookDefinition {
    pub url: String,
    /// Header name to values; every value is sent as its own header line.
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    /// JSON field holding the text.  Absent or empty means plain-text body.
    #[serde(default)]
    pub key: Option<String>,
    /// Value at `key` is a list of time buckets instead of a string.
    #[serde(default)]
    pub time: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookConfigError {
    #[error("hook '{hook}': {source}")]
    Template {
        hook: String,
        #[source]
        source: TemplateError,
    },
    #[error("hook '{hook}': invalid header '{name}'")]
    Header { hook: String, name: String },
    #[error("hook '{0}': time mode requires a key")]
    TimeWithoutKey(String),
    #[error("default hook '{0}' is not registered")]
    UnknownDefault(String),
}

/// Shape of the remote response, decided solely by `key` and `time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookMode {
    PlainText,
    KeyedText { key: String },
    KeyedTimeBuckets { key: String },
}

impl HookMode {
    fn from_parts(hook: &str, key: Option<&str>, time: bool) -> Result<Self, HookConfigError> {
        match (key.filter(|k| !k.is_empty()), time) {
            (None, false) => Ok(HookMode::PlainText),
            (None, true) => Err(HookConfigError::TimeWithoutKey(hook.to_string())),
            (Some(k), false) => Ok(HookMode::KeyedText { key: k.to_string() }),
            (Some(k), true) => Ok(HookMode::KeyedTimeBuckets { key: k.to_string() }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookMode::PlainText => "plain_text",
            HookMode::KeyedText { .. } => "keyed_text",
            HookMode::KeyedTimeBuckets { .. } => "time_buckets",
        }
    }
}

/// A validated hook.
#[derive(Debug, Clone)]
pub struct Hook {
    pub id: String,
    pub url: UrlTemplate,
    pub headers: HeaderMap,
    pub mode: HookMode,
}

impl Hook {
    pub fn from_definition(id: &str, def: &HookDefinition) -> Result<Self, HookConfigError> {
        let url = UrlTemplate::parse(&def.url).map_err(|source| HookConfigError::Template {
            hook: id.to_string(),
            source,
        })?;
        let mut headers = HeaderMap::new();
        for (name, values) in &def.headers {
            let bad_header = || HookConfigError::Header {
                hook: id.to_string(),
                name: name.clone(),
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| bad_header())?;
            for value in values {
                let header_value = HeaderValue::from_str(value).map_err(|_| bad_header())?;
                headers.append(header_name.clone(), header_value);
            }
        }
        let mode = HookMode::from_parts(id, def.key.as_deref(), def.time)?;
        Ok(Self {
            id: id.to_string(),
            url,
            headers,
            mode,
        })
    }
}

/// Immutable map of hook id to hook plus the designated default.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Hook>,
    default_hook: Option<String>,
}

impl HookRegistry {
    pub fn from_config(cfg: &HookConfig) -> Result<Self, HookConfigError> {
        let mut hooks = HashMap::with_capacity(cfg.hooks.len());
        for (id, def) in &cfg.hooks {
            hooks.insert(id.clone(), Hook::from_definition(id, def)?);
        }
        if let Some(default) = &cfg.default_hook {
            if !hooks.contains_key(default) {
                return Err(HookConfigError::UnknownDefault(default.clone()));
            }
        }
        Ok(Self {
            hooks,
            default_hook: cfg.default_hook.clone(),
        })
    }

    /// Resolve a hook.  `None` selects the default hook; an unknown id or a
    /// missing default yields `None`.
    pub fn lookup(&self, hook_id: Option<&str>) -> Option<&Hook> {
        let id = hook_id.or(self.default_hook.as_deref())?;
        self.hooks.get(id)
    }

    pub fn default_hook(&self) -> Option<&str> {
        self.default_hook.as_deref()
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
