//! In-process stand-in for a ComfyUI server.
//!
//! Binds an axum router to `127.0.0.1:0` and answers the four endpoints the
//! runner uses. Request counts are tracked with atomics so tests can assert
//! how many round-trips happened.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nova_comfyui::config::EngineConfig;
use serde::Deserialize;
use serde_json::{json, Value};

pub const PROMPT_ID: &str = "prompt-123";
pub const IMAGE_BYTES: &[u8] = b"\x89PNG fake image";

/// How the mock engine behaves for a submission.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// History reports `completed` on the n-th poll (1-based); earlier
    /// polls report a running entry.
    CompleteAfter(usize),
    /// History reports `error` with the message on the n-th poll.
    ErrorAfter(usize, String),
    /// History never contains the prompt key.
    NeverStarts,
    /// History always contains a non-terminal entry.
    AlwaysPending,
    /// `POST /api/prompt` answers 500.
    RejectSubmit,
    /// `POST /api/prompt` answers 200 without an id.
    MissingId,
    /// Completes immediately but with no images in any node.
    NoImages,
    /// Completes immediately with one image carrying this filename.
    CompleteWithFilename(String),
    /// Completes immediately, then `GET /view` answers 500.
    ViewFails,
}

#[derive(Default)]
pub struct Counters {
    pub submits: AtomicUsize,
    pub polls: AtomicUsize,
    pub views: AtomicUsize,
    pub deletes: AtomicUsize,
}

pub struct MockEngine {
    pub addr: SocketAddr,
    pub counters: Arc<Counters>,
    pub last_prompt: Arc<Mutex<Option<Value>>>,
    pub last_view: Arc<Mutex<Option<ViewQuery>>>,
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    counters: Arc<Counters>,
    last_prompt: Arc<Mutex<Option<Value>>>,
    last_view: Arc<Mutex<Option<ViewQuery>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewQuery {
    pub filename: String,
    pub subfolder: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MockEngine {
    pub async fn start(behavior: Behavior) -> Self {
        let counters = Arc::new(Counters::default());
        let last_prompt = Arc::new(Mutex::new(None));
        let last_view = Arc::new(Mutex::new(None));
        let state = MockState {
            behavior,
            counters: counters.clone(),
            last_prompt: last_prompt.clone(),
            last_view: last_view.clone(),
        };

        let app = Router::new()
            .route("/api/prompt", post(submit))
            .route("/api/history/{id}", get(history))
            .route("/view", get(view))
            .route("/api/queue", post(queue))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            counters,
            last_prompt,
            last_view,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn submits(&self) -> usize {
        self.counters.submits.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.counters.polls.load(Ordering::SeqCst)
    }

    pub fn views(&self) -> usize {
        self.counters.views.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.counters.deletes.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Value> {
        self.last_prompt.lock().unwrap().clone()
    }

    /// Engine config pointed at this server with fast polling.
    pub fn config(&self, output_dir: &Path) -> EngineConfig {
        EngineConfig {
            api_url: self.url(),
            poll_interval: Duration::from_millis(20),
            poll_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            output_dir: output_dir.to_path_buf(),
            ..EngineConfig::default()
        }
    }
}

/// Write a generation template exercising every placeholder kind.
pub fn write_generation_template(dir: &Path) -> PathBuf {
    let path = dir.join("generation.json");
    let template = json!({
        "3": {
            "class_type": "KSampler",
            "inputs": {
                "seed": "{{seed}}",
                "steps": "{{steps}}",
                "cfg": "{{cfg_scale}}",
                "sampler_name": "{{sampler}}",
                "scheduler": "{{scheduler}}",
                "denoise": 1
            }
        },
        "4": {
            "class_type": "CheckpointLoaderSimple",
            "inputs": {"ckpt_name": "{{base_model}}"}
        },
        "6": {
            "class_type": "CLIPTextEncode",
            "inputs": {"text": "{{prompt}}"}
        },
        "7": {
            "class_type": "CLIPTextEncode",
            "inputs": {"text": "{{negative_prompt}}"}
        }
    });
    std::fs::write(&path, template.to_string()).unwrap();
    path
}

/// Write an upscale template.
pub fn write_upscale_template(dir: &Path) -> PathBuf {
    let path = dir.join("upscale.json");
    let template = json!({
        "1": {"class_type": "LoadImage", "inputs": {"image": "{{image_path}}"}},
        "2": {"class_type": "UpscaleModelLoader", "inputs": {"model_name": "{{model_name}}"}},
        "3": {"class_type": "ImageScaleBy", "inputs": {"scale_by": "{{upscale_factor}}"}}
    });
    std::fs::write(&path, template.to_string()).unwrap();
    path
}

async fn submit(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.counters.submits.fetch_add(1, Ordering::SeqCst);
    *state.last_prompt.lock().unwrap() = body.get("prompt").cloned();

    match state.behavior {
        Behavior::RejectSubmit => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "invalid prompt"})),
        )
            .into_response(),
        Behavior::MissingId => Json(json!({"number": 1})).into_response(),
        _ => Json(json!({"prompt_id": PROMPT_ID, "number": 1})).into_response(),
    }
}

async fn history(State(state): State<MockState>, UrlPath(id): UrlPath<String>) -> Json<Value> {
    let poll = state.counters.polls.fetch_add(1, Ordering::SeqCst) + 1;

    let running = json!({ id.clone(): {"status": {"status": "running"}, "outputs": {}} });
    let completed_with = |filename: &str| {
        json!({ id.clone(): {
            "status": {"status_str": "success", "completed": true},
            "outputs": {
                "9": {"images": [{"filename": filename, "subfolder": "", "type": "output"}]}
            }
        }})
    };
    let completed = completed_with("ComfyUI_00001_.png");

    let body = match &state.behavior {
        Behavior::CompleteAfter(n) if poll >= *n => completed,
        Behavior::ViewFails => completed,
        Behavior::CompleteWithFilename(filename) => completed_with(filename),
        Behavior::CompleteAfter(_) | Behavior::AlwaysPending => running,
        Behavior::ErrorAfter(n, message) if poll >= *n => json!({ id.clone(): {
            "status": {"status": "error", "error": message},
            "outputs": {}
        }}),
        Behavior::ErrorAfter(_, _) => running,
        Behavior::NeverStarts => json!({}),
        Behavior::NoImages => json!({ id.clone(): {
            "status": {"status": "completed"},
            "outputs": {"9": {"text": ["nothing"]}}
        }}),
        Behavior::RejectSubmit | Behavior::MissingId => json!({}),
    };
    Json(body)
}

async fn view(State(state): State<MockState>, Query(query): Query<ViewQuery>) -> Response {
    state.counters.views.fetch_add(1, Ordering::SeqCst);
    *state.last_view.lock().unwrap() = Some(query);
    match state.behavior {
        Behavior::ViewFails => (StatusCode::INTERNAL_SERVER_ERROR, "disk error").into_response(),
        _ => IMAGE_BYTES.to_vec().into_response(),
    }
}

async fn queue(State(state): State<MockState>, Json(_body): Json<Value>) -> StatusCode {
    state.counters.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}
