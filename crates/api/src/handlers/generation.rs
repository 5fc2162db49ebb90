//! Handlers for the synchronous generation and upscale endpoints.
//!
//! Each request stays open for the whole submit/poll/download cycle.

use std::path::PathBuf;

use axum::extract::State;
use axum::Json;
use nova_comfyui::params::{GenerationParams, UpscaleParams};
use nova_comfyui::runner::{GenerationResult, GenerationStatus};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response body for a completed generation or upscale.
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub job_id: String,
    pub status: GenerationStatus,
    pub image_path: PathBuf,
    pub history: Value,
}

impl From<GenerationResult> for GenerationResponse {
    fn from(result: GenerationResult) -> Self {
        Self {
            job_id: result.submission_id,
            status: result.status,
            image_path: result.local_artifact_path,
            history: result.raw_history,
        }
    }
}

/// POST /api/generate-image
pub async fn generate_image(
    State(state): State<AppState>,
    Json(params): Json<GenerationParams>,
) -> AppResult<Json<DataResponse<GenerationResponse>>> {
    let cancel = state.shutdown.child_token();
    let result = state.runner.run_generation_workflow(&params, &cancel).await?;

    tracing::info!(
        job_id = %result.submission_id,
        image_path = %result.local_artifact_path.display(),
        "Image generated",
    );

    Ok(Json(DataResponse {
        data: result.into(),
    }))
}

/// POST /api/upscale
pub async fn upscale_image(
    State(state): State<AppState>,
    Json(params): Json<UpscaleParams>,
) -> AppResult<Json<DataResponse<GenerationResponse>>> {
    let cancel = state.shutdown.child_token();
    let result = state.runner.run_upscale_workflow(&params, &cancel).await?;

    tracing::info!(
        job_id = %result.submission_id,
        image_path = %result.local_artifact_path.display(),
        "Image upscaled",
    );

    Ok(Json(DataResponse {
        data: result.into(),
    }))
}
