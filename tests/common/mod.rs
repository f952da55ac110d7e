#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use casa_hub::config::Config;
use casa_hub::db::HomeStorage;
use casa_hub::router::{HubState, hub_router};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const HUB_KEY: &str = "test-key";

static SEQ: AtomicUsize = AtomicUsize::new(0);

pub struct TestHub {
    pub app: Router,
    pub storage: HomeStorage,
    pub db_path: PathBuf,
}

impl Drop for TestHub {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// Defaults with a fixed hub key, independent of any local `config.toml`.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.basic.hub_key = HUB_KEY.to_string();
    cfg.basic.public_url = "http://hub.test".to_string();
    cfg.basic.default_redirect_url = "http://app.test/".to_string();
    cfg.smartthings.state_secret = "state-secret".to_string();
    cfg
}

pub async fn temp_storage(tag: &str) -> (HomeStorage, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "casa-hub-{tag}-{}-{}-{}.sqlite",
        std::process::id(),
        nanos,
        SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let storage = casa_hub::db::connect(&format!("sqlite:{}", path.display()))
        .await
        .expect("failed to open temp database");
    (storage, path)
}

pub async fn hub_with(tag: &str, cfg: Config, customize: impl FnOnce(HubState) -> HubState) -> TestHub {
    let (storage, db_path) = temp_storage(tag).await;
    let state = HubState::new(Arc::new(cfg), storage.clone())
        .await
        .expect("failed to build hub state");
    TestHub {
        app: hub_router(customize(state)),
        storage,
        db_path,
    }
}

pub async fn hub(tag: &str) -> TestHub {
    hub_with(tag, test_config(), |s| s).await
}

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind upstream");
    let addr = listener.local_addr().expect("upstream has no address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

impl TestHub {
    /// Send an authenticated request as `user`.
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        user: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-hub-key", HUB_KEY)
            .header("x-user-id", user);
        self.send(builder, body).await
    }

    pub async fn send(
        &self,
        builder: axum::http::request::Builder,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");
        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// GET `uri` without credentials and return the status plus `Location`.
    pub async fn redirect(&self, uri: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request");
        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let location = resp
            .headers()
            .get(axum::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (resp.status(), location)
    }
}
