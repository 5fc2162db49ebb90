//! Handlers for training launch and the `/jobs` resource.

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use nova_core::types::Timestamp;
use nova_training::job::{TrainLoraRequest, TrainingJob, TrainingStatus};
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Wire shape of a training job.
#[derive(Debug, Serialize)]
pub struct TrainingJobResponse {
    pub job_id: String,
    pub status: TrainingStatus,
    pub log_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_weight: PathBuf,
    pub command: Vec<String>,
    pub created_at: Timestamp,
    pub exit_code: Option<i32>,
    pub finished_at: Option<Timestamp>,
}

impl From<TrainingJob> for TrainingJobResponse {
    fn from(job: TrainingJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            log_path: job.log_path,
            output_dir: job.output_dir,
            output_weight: job.output_weight_path,
            command: job.command,
            created_at: job.created_at,
            exit_code: job.exit_code,
            finished_at: job.finished_at,
        }
    }
}

/// POST /api/train-lora
///
/// Returns 201 as soon as the process is running.
pub async fn train_lora(
    State(state): State<AppState>,
    Json(request): Json<TrainLoraRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state.supervisor.launch(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TrainingJobResponse::from(job),
        }),
    ))
}

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<TrainingJobResponse>>> {
    let jobs = state.supervisor.list_jobs().await;
    Json(DataResponse {
        data: jobs.into_iter().map(TrainingJobResponse::from).collect(),
    })
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<TrainingJobResponse>>> {
    let job = state.supervisor.get_job(&id).await?;
    Ok(Json(DataResponse { data: job.into() }))
}

/// POST /api/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<TrainingJobResponse>>> {
    let job = state.supervisor.cancel_job(&id).await?;
    Ok(Json(DataResponse { data: job.into() }))
}
