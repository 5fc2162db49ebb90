#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use nova_api::config::{ServerConfig, WorkerConfig};
use nova_api::router::build_router;
use nova_api::state::AppState;
use nova_comfyui::config::EngineConfig;
use nova_training::config::TrainingConfig;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Temporary worker layout: a kohya checkout with `train.sh` and a
/// checkpoint, a dataset root with one dataset, and output directories.
pub struct TestWorker {
    pub dir: TempDir,
    pub app: Router,
    pub state: AppState,
}

impl TestWorker {
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

pub fn test_config(root: &std::path::Path) -> WorkerConfig {
    WorkerConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        },
        engine: EngineConfig {
            // Nothing listens here; tests never reach the engine.
            api_url: "http://127.0.0.1:1".to_string(),
            poll_interval: Duration::from_millis(10),
            poll_timeout: Duration::from_millis(100),
            request_timeout: Duration::from_secs(1),
            output_dir: root.join("results"),
            ..EngineConfig::default()
        },
        training: TrainingConfig {
            engine_root: root.join("kohya"),
            python: "sh".to_string(),
            train_script: "train.sh".to_string(),
            output_root: root.join("lora"),
            dataset_root: Some(root.join("datasets")),
            default_base_model: Some("model.safetensors".to_string()),
            model_root: None,
        },
        dataset_listing_root: root.join("datasets"),
    }
}

/// Build the full router over a fresh temporary layout.
pub fn build_test_app(train_script: &str) -> TestWorker {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("kohya")).unwrap();
    std::fs::write(root.join("kohya/train.sh"), train_script).unwrap();
    std::fs::write(root.join("kohya/model.safetensors"), b"weights").unwrap();
    std::fs::create_dir_all(root.join("datasets/c1")).unwrap();
    std::fs::write(root.join("datasets/c1/001.png"), b"img").unwrap();

    let state = AppState::new(test_config(root), CancellationToken::new()).unwrap();
    let app = build_router(state.clone()).unwrap();
    TestWorker { dir, app, state }
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}
