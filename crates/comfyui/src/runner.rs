//! End-to-end generation and upscale runs against a ComfyUI server.
//!
//! [`WorkflowRunner`] ties the pieces together: load a template, fill its
//! placeholders, submit, wait for a terminal history record, pick the first
//! output image, and download it. Each run is stateless; nothing is kept
//! once the result (or error) is returned.

use std::path::{Path, PathBuf};

use chrono::Utc;
use nova_core::error::CoreError;
use nova_core::types::{Params, Timestamp};
use nova_core::workflow;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::ComfyUIApi;
use crate::config::EngineConfig;
use crate::history::{self, ArtifactRef, EngineHistoryRecord};
use crate::params::{GenerationParams, UpscaleParams};
use crate::poller;

/// One accepted submission on the engine.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionHandle {
    /// Engine-assigned prompt id.
    pub id: String,
    /// Correlation id generated for this submission.
    pub client_id: String,
    /// Used to prefix the local artifact name.
    pub submitted_at: Timestamp,
}

/// Terminal state of a successful run. Failures are errors, not results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
}

/// Outcome of a completed generation or upscale.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub submission_id: String,
    pub status: GenerationStatus,
    pub local_artifact_path: PathBuf,
    /// The engine's history entry for the submission.
    pub raw_history: Value,
}

/// Drives workflows through a single ComfyUI instance.
#[derive(Debug, Clone)]
pub struct WorkflowRunner {
    api: ComfyUIApi,
    config: EngineConfig,
}

impl WorkflowRunner {
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let api = ComfyUIApi::new(&config.api_url, config.request_timeout)
            .map_err(|e| e.into_engine_error("build ComfyUI HTTP client"))?;
        Ok(Self { api, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Queue a prepared workflow description.
    pub async fn submit(&self, description: &Value) -> Result<SubmissionHandle, CoreError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let submitted_at = Utc::now();

        let response = self
            .api
            .submit_workflow(description, &client_id)
            .await
            .map_err(|e| e.into_engine_error("submit workflow"))?;

        let id = response
            .submission_id()
            .ok_or_else(|| CoreError::Engine("ComfyUI did not return a prompt_id.".to_string()))?
            .to_string();

        tracing::info!(
            prompt_id = %id,
            client_id = %client_id,
            queue_number = ?response.number,
            "Workflow submitted",
        );

        Ok(SubmissionHandle {
            id,
            client_id,
            submitted_at,
        })
    }

    /// Wait for the submission to reach a terminal status.
    pub async fn await_completion(
        &self,
        handle: &SubmissionHandle,
        cancel: &CancellationToken,
    ) -> Result<EngineHistoryRecord, CoreError> {
        poller::await_completion(&self.api, &handle.id, &self.config.poll(), cancel).await
    }

    /// Download `artifact` into `destination_dir` and return the local path.
    ///
    /// The file is named `<submission unix millis>_<filename>`, keeping only
    /// the last component of the engine-supplied name.
    pub async fn fetch_artifact(
        &self,
        handle: &SubmissionHandle,
        artifact: &ArtifactRef,
        destination_dir: &Path,
    ) -> Result<PathBuf, CoreError> {
        let basename = Path::new(&artifact.filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CoreError::Engine("Image metadata missing filename.".to_string()))?;

        let bytes = self
            .api
            .view(artifact)
            .await
            .map_err(|e| e.into_engine_error("download image"))?;

        tokio::fs::create_dir_all(destination_dir).await?;
        let local_path = destination_dir.join(format!(
            "{}_{basename}",
            handle.submitted_at.timestamp_millis()
        ));
        tokio::fs::write(&local_path, &bytes).await?;

        tracing::info!(
            prompt_id = %handle.id,
            path = %local_path.display(),
            bytes = bytes.len(),
            "Artifact saved",
        );
        Ok(local_path)
    }

    /// Run the generation template with `params`.
    pub async fn run_generation_workflow(
        &self,
        params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, CoreError> {
        let template = workflow::load_template(self.config.generation_workflow_path.as_deref())?;

        let base_model = params
            .base_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .or_else(|| {
                self.config
                    .default_base_model
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
            })
            .ok_or_else(|| {
                CoreError::Config(
                    "No base model specified. Provide base_model in the request or set COMFYUI_BASE_MODEL."
                        .to_string(),
                )
            })?;

        let seed = params.seed.unwrap_or_else(|| Utc::now().timestamp());
        let values = params.to_params(base_model, seed);

        tracing::debug!(seed, base_model, "Preparing generation workflow");
        self.execute(&template, &values, cancel).await
    }

    /// Run the upscale template with `params`.
    pub async fn run_upscale_workflow(
        &self,
        params: &UpscaleParams,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, CoreError> {
        let template = workflow::load_template(self.config.upscale_workflow_path.as_deref())?;

        if params.image_path.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "image_path is required for upscaling".to_string(),
            ));
        }

        self.execute(&template, &params.to_params(), cancel).await
    }

    /// Substitute, submit, wait, locate, download.
    async fn execute(
        &self,
        template: &Value,
        values: &Params,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, CoreError> {
        let description = workflow::substitute(template, values);

        let unresolved = workflow::unresolved_placeholders(&description);
        if !unresolved.is_empty() {
            tracing::warn!(placeholders = ?unresolved, "Workflow still contains unresolved placeholders");
        }

        let handle = self.submit(&description).await?;

        let record = match self.await_completion(&handle, cancel).await {
            Ok(record) => record,
            Err(err @ CoreError::Cancelled(_)) => {
                if let Err(e) = self.api.cancel_execution(&handle.id).await {
                    tracing::warn!(prompt_id = %handle.id, error = %e, "Failed to remove cancelled prompt from queue");
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let artifact = history::locate_artifact(&record)?;
        let local_artifact_path = self
            .fetch_artifact(&handle, &artifact, &self.config.output_dir)
            .await?;

        Ok(GenerationResult {
            submission_id: handle.id,
            status: GenerationStatus::Completed,
            local_artifact_path,
            raw_history: record.raw,
        })
    }
}
