//! Classifies a fetched body into one of the three accepted shapes.
//!
//! Malformed JSON is a [`InterpretError::Decode`]; well-formed JSON that
//! lacks the configured key or carries the wrong types is a
//! [`InterpretError::Shape`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Hook, HookMode};

/// A time-stamped span of text.  Timestamps are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    PlainText(String),
    KeyedText(String),
    KeyedTimeBuckets(Vec<TimeBucket>),
}

#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("response body is not valid JSON")]
    Decode(#[source] serde_json::Error),
    /// `detail` names positions and field names only, never upstream values;
    /// the serde error, which may quote them, stays in `source`.
    #[error("{detail}")]
    Shape {
        detail: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl InterpretError {
    fn shape(detail: String) -> Self {
        InterpretError::Shape {
            detail,
            source: None,
        }
    }
}

pub fn interpret(hook: &Hook, body: String) -> Result<Content, InterpretError> {
    match &hook.mode {
        HookMode::PlainText => Ok(Content::PlainText(body)),
        HookMode::KeyedText { key } => match take_key(&body, key)? {
            Value::String(text) => Ok(Content::KeyedText(text)),
            other => Err(InterpretError::shape(format!(
                "value at '{}' must be a string, found {}",
                key,
                kind(&other)
            ))),
        },
        HookMode::KeyedTimeBuckets { key } => {
            let items = match take_key(&body, key)? {
                Value::Array(items) => items,
                other => {
                    return Err(InterpretError::shape(format!(
                        "value at '{}' must be an array of time buckets, found {}",
                        key,
                        kind(&other)
                    )))
                }
            };
            let mut buckets = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                let bucket: TimeBucket =
                    serde_json::from_value(item).map_err(|source| InterpretError::Shape {
                        detail: format!(
                            "time bucket {} under '{}' has a missing or mistyped field",
                            idx, key
                        ),
                        source: Some(source),
                    })?;
                if bucket.start >= bucket.end {
                    return Err(InterpretError::shape(format!(
                        "time bucket {} under '{}' does not start before it ends",
                        idx, key
                    )));
                }
                buckets.push(bucket);
            }
            Ok(Content::KeyedTimeBuckets(buckets))
        }
    }
}

fn take_key(body: &str, key: &str) -> Result<Value, InterpretError> {
    let mut doc: Value = serde_json::from_str(body).map_err(InterpretError::Decode)?;
    match doc.as_object_mut().and_then(|obj| obj.remove(key)) {
        Some(value) => Ok(value),
        None => Err(InterpretError::shape(format!("missing key '{}'", key))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{HookConfig, HookRegistry};
    use serde_json::json;

    fn registry() -> HookRegistry {
        let cfg: HookConfig = serde_json::from_value(json!({
            "hooks": {
                "plain": {"url": "http://h/%v"},
                "keyed": {"url": "http://h/%v", "key": "body"},
                "timed": {"url": "http://h/%v", "key": "transcript", "time": true}
            }
        }))
        .unwrap();
        HookRegistry::from_config(&cfg).unwrap()
    }

    fn run(hook: &str, body: &str) -> Result<Content, InterpretError> {
        let reg = registry();
        interpret(reg.lookup(Some(hook)).unwrap(), body.to_string())
    }

    #[test]
    fn plain_text_is_used_verbatim() {
        let body = "{\"looks\": \"like json\"} but is plain";
        assert_eq!(run("plain", body).unwrap(), Content::PlainText(body.into()));
    }

    #[test]
    fn keyed_text_extracts_string() {
        let got = run("keyed", r#"{"id": 1, "body": "hello there"}"#).unwrap();
        assert_eq!(got, Content::KeyedText("hello there".into()));
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert!(matches!(run("keyed", "{\"body\": "), Err(InterpretError::Decode(_))));
        assert!(matches!(run("timed", "not json"), Err(InterpretError::Decode(_))));
    }

    #[test]
    fn wrong_shape_is_shape_error() {
        assert!(matches!(run("keyed", r#"{"other": "x"}"#), Err(InterpretError::Shape { .. })));
        assert!(matches!(run("keyed", r#"{"body": 3}"#), Err(InterpretError::Shape { .. })));
        assert!(matches!(run("keyed", r#"["body"]"#), Err(InterpretError::Shape { .. })));
        assert!(matches!(run("timed", r#"{"transcript": "x"}"#), Err(InterpretError::Shape { .. })));
    }

    #[test]
    fn time_buckets_keep_source_order() {
        let body = json!({"transcript": [
            {"start": 16.016, "end": 24.014, "text": "later"},
            {"start": 0, "end": 16.016, "text": "earlier"}
        ]})
        .to_string();
        match run("timed", &body).unwrap() {
            Content::KeyedTimeBuckets(buckets) => {
                assert_eq!(buckets.len(), 2);
                assert_eq!(buckets[0].text, "later");
                assert_eq!(buckets[1].start, 0.0);
                assert_eq!(buckets[1].end, 16.016);
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn empty_bucket_list_is_valid() {
        assert_eq!(
            run("timed", r#"{"transcript": []}"#).unwrap(),
            Content::KeyedTimeBuckets(vec![])
        );
    }

    #[test]
    fn incomplete_or_mistyped_buckets_are_shape_errors() {
        let missing = json!({"transcript": [{"start": 0, "end": 1}]}).to_string();
        assert!(matches!(run("timed", &missing), Err(InterpretError::Shape { .. })));
        let mistyped = json!({"transcript": [{"start": "0", "end": 1, "text": "x"}]}).to_string();
        assert!(matches!(run("timed", &mistyped), Err(InterpretError::Shape { .. })));
        let inverted = json!({"transcript": [{"start": 2, "end": 1, "text": "x"}]}).to_string();
        assert!(matches!(run("timed", &inverted), Err(InterpretError::Shape { .. })));
    }

    #[test]
    fn bucket_shape_detail_does_not_quote_upstream_values() {
        let body = json!({"transcript": [
            {"start": 0, "end": 1, "text": "ok"},
            {"start": "upstream-token-42", "end": 1, "text": "x"}
        ]})
        .to_string();
        match run("timed", &body) {
            Err(InterpretError::Shape { detail, source }) => {
                assert_eq!(
                    detail,
                    "time bucket 1 under 'transcript' has a missing or mistyped field"
                );
                assert!(source.unwrap().to_string().contains("upstream-token-42"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
