#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

use grc_nexus::config::Config;
use grc_nexus::db::GrcStorage;
use grc_nexus::router::{NexusState, nexus_router};
use grc_nexus::service::assistant::AiAssistant;

pub const KEY: &str = "pwd";

/// Router over a throwaway SQLite file, removed on drop.
pub struct TestApp {
    pub app: Router,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.db_path);
        for suffix in ["-wal", "-shm"] {
            let mut side = self.db_path.clone().into_os_string();
            side.push(suffix);
            let _ = fs::remove_file(side);
        }
    }
}

pub async fn spawn_app(tag: &str) -> TestApp {
    spawn_app_with(tag, Config::default()).await
}

pub async fn spawn_app_with(tag: &str, mut cfg: Config) -> TestApp {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut db_path = std::env::temp_dir();
    db_path.push(format!(
        "grc-nexus-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));

    let database_url = format!("sqlite:{}", db_path.display());
    let storage = GrcStorage::connect(&database_url)
        .await
        .expect("failed to open test database");

    cfg.basic.nexus_key = KEY.to_string();
    let assistant = AiAssistant::new(cfg.ai()).expect("failed to build assistant");
    let state = NexusState::new(storage, assistant, cfg.basic());
    TestApp {
        app: nexus_router(state),
        db_path,
    }
}

impl TestApp {
    /// Authenticated JSON request, optionally scoped to an organisation.
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        org: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-nexus-key", KEY);
        if let Some(org) = org {
            builder = builder.header("x-organization-id", org.to_string());
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn create_org(&self, name: &str, appetite: i64) -> i64 {
        let (status, body) = self
            .call(
                "POST",
                "/api/organizations",
                None,
                Some(serde_json::json!({"name": name, "risk_appetite": appetite})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().expect("organization id")
    }
}

pub fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().expect("id in response")
}
