//! Engine connection and workflow settings.

use std::path::PathBuf;
use std::time::Duration;

use nova_core::config::{self, process_env};
use nova_core::error::CoreError;
use nova_core::paths::expand_user;

use crate::poller::PollConfig;

/// Default ComfyUI base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8188";

/// Default checkpoint used when a generation request names none.
pub const DEFAULT_BASE_MODEL: &str = "sd_xl_base_1.0.safetensors";

/// Default destination for downloaded artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "storage/results";

/// Settings for talking to the generation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base HTTP URL, without a trailing slash.
    pub api_url: String,
    /// Sleep between history polls.
    pub poll_interval: Duration,
    /// Wall-clock bound on the whole poll loop.
    pub poll_timeout: Duration,
    /// Bound on each individual HTTP call.
    pub request_timeout: Duration,
    /// Checkpoint substituted for `{{base_model}}` when the request has none.
    pub default_base_model: Option<String>,
    /// Template used by generation requests.
    pub generation_workflow_path: Option<PathBuf>,
    /// Template used by upscale requests.
    pub upscale_workflow_path: Option<PathBuf>,
    /// Directory downloaded artifacts are written to.
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            poll_timeout: Duration::from_secs(180),
            request_timeout: Duration::from_secs(30),
            default_base_model: Some(DEFAULT_BASE_MODEL.to_string()),
            generation_workflow_path: None,
            upscale_workflow_path: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl EngineConfig {
    /// Load from the process environment.
    ///
    /// | Env Var                          | Default                       |
    /// |----------------------------------|-------------------------------|
    /// | `COMFYUI_API_URL`                | `http://localhost:8188`       |
    /// | `COMFYUI_POLL_INTERVAL`          | `2.0` (seconds)               |
    /// | `COMFYUI_POLL_TIMEOUT`           | `180` (seconds)               |
    /// | `COMFYUI_REQUEST_TIMEOUT`        | `30` (seconds)                |
    /// | `COMFYUI_BASE_MODEL`             | `sd_xl_base_1.0.safetensors`  |
    /// | `COMFYUI_WORKFLOW_PATH`          | unset                         |
    /// | `COMFYUI_UPSCALE_WORKFLOW_PATH`  | unset                         |
    /// | `OUTPUT_DIR`                     | `storage/results`             |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(process_env)
    }

    /// Load from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = config::string(&lookup, "COMFYUI_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_url,
            poll_interval: config::secs_or(&lookup, "COMFYUI_POLL_INTERVAL", 2.0)?,
            poll_timeout: config::secs_or(&lookup, "COMFYUI_POLL_TIMEOUT", 180.0)?,
            request_timeout: config::secs_or(&lookup, "COMFYUI_REQUEST_TIMEOUT", 30.0)?,
            default_base_model: Some(
                config::string(&lookup, "COMFYUI_BASE_MODEL")
                    .unwrap_or_else(|| DEFAULT_BASE_MODEL.to_string()),
            ),
            generation_workflow_path: config::string(&lookup, "COMFYUI_WORKFLOW_PATH")
                .map(|p| expand_user(&p)),
            upscale_workflow_path: config::string(&lookup, "COMFYUI_UPSCALE_WORKFLOW_PATH")
                .map(|p| expand_user(&p)),
            output_dir: expand_user(
                &config::string(&lookup, "OUTPUT_DIR")
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
        })
    }

    /// Poll loop bounds derived from this config.
    pub fn poll(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            timeout: self.poll_timeout,
        }
    }
}
