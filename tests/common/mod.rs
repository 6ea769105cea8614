#![allow(dead_code)]

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::{routing::get, Json, Router};
use sentiment_hooks::hooks::HookConfig;
use sentiment_hooks::{app, build_state, AppConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

pub const COMMENT_TEXT: &str = "What a great and helpful comment, thanks!";
pub const POST_TEXT: &str = "The anti-immigration people have to invent some explanation. \
     There are just not enough great programmers to go around";

/// Upstream value that must never reach a caller.
pub const UPSTREAM_SECRET: &str = "upstream-session-7f3a";

pub fn transcript() -> Value {
    json!([
        {"start": 0, "end": 16.016, "text": "This is some great text!"},
        {"start": 16.016, "end": 24.014, "text": "I really hate this sentence though..."},
        {"start": 24.014, "end": 30.5, "text": "Nothing much to say here"}
    ])
}

/// Stand-in for a caller's remote record source.
pub async fn start_mock_source() -> (SocketAddr, JoinHandle<()>) {
    async fn comment(Path(id): Path<String>) -> String {
        format!("{} (#{})", COMMENT_TEXT, id)
    }
    async fn post(Path(id): Path<String>) -> Json<Value> {
        Json(json!({"id": id, "title": "t", "body": POST_TEXT}))
    }
    async fn recording(Path(_id): Path<String>) -> Json<Value> {
        Json(json!({"transcript": transcript(), "duration": 30.5}))
    }
    async fn broken(Path(_id): Path<String>) -> &'static str {
        "{\"body\": \"unterminated"
    }
    async fn wrong_shape(Path(_id): Path<String>) -> Json<Value> {
        Json(json!({"transcript": [{"start": 0, "end": 1}]}))
    }
    async fn mistyped(Path(_id): Path<String>) -> Json<Value> {
        Json(json!({"transcript": [{"start": UPSTREAM_SECRET, "end": 1, "text": "x"}]}))
    }
    async fn missing(Path(_id): Path<String>) -> (StatusCode, &'static str) {
        (StatusCode::NOT_FOUND, "record not found")
    }
    async fn guarded(Path(_id): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
        let tags: Vec<_> = headers
            .get_all("x-tag")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let authorized = headers.get("authorization").and_then(|v| v.to_str().ok())
            == Some("Bearer hook-secret");
        if authorized && tags == ["alpha", "beta"] {
            (StatusCode::OK, Json(json!({"text": "a lovely secret"})))
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({"error": "nope"})))
        }
    }

    let app = Router::new()
        .route("/comments/:id", get(comment))
        .route("/posts/:id", get(post))
        .route("/recordings/:id", get(recording))
        .route("/broken/:id", get(broken))
        .route("/shape/:id", get(wrong_shape))
        .route("/mistyped/:id", get(mistyped))
        .route("/missing/:id", get(missing))
        .route("/guarded/:id", get(guarded));
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

/// Hook file pointing every hook at the mock source.
pub fn hook_config(source: SocketAddr) -> HookConfig {
    let base = format!("http://{}", source);
    serde_json::from_value(json!({
        "defaultHook": "post",
        "hooks": {
            "comment": {"url": format!("{}/comments/%v", base)},
            "post": {"url": format!("{}/posts/%v", base), "key": "body"},
            "recording": {"url": format!("{}/recordings/%v", base), "key": "transcript", "time": true},
            "broken": {"url": format!("{}/broken/%v", base), "key": "body"},
            "shape": {"url": format!("{}/shape/%v", base), "key": "transcript", "time": true},
            "mistyped": {"url": format!("{}/mistyped/%v", base), "key": "transcript", "time": true},
            "missing": {"url": format!("{}/missing/%v", base)},
            "guarded": {
                "url": format!("{}/guarded/%v", base),
                "key": "text",
                "headers": {"Authorization": ["Bearer hook-secret"], "X-Tag": ["alpha", "beta"]}
            }
        }
    }))
    .unwrap()
}

pub fn config_for(source: SocketAddr) -> AppConfig {
    AppConfig {
        hook_config: hook_config(source),
        fetch_timeout_ms: 2_000,
        ..AppConfig::default()
    }
}

/// Spawn the service on an ephemeral port; returns its base URL.
pub async fn spawn_app(config: AppConfig) -> (String, JoinHandle<()>) {
    let state = build_state(config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if !self.originals.contains_key(key) {
            self.originals.insert(key.to_string(), std::env::var(key).ok());
        }
        std::env::set_var(key, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
