//! Dataset folder listing and image intake.

use std::path::{Path, PathBuf};

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use nova_core::error::CoreError;
use nova_core::paths::{ensure_contained, expand_user, is_safe_component, resolve};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DatasetQuery {
    /// Sub-directory of the dataset root to list.
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatasetEntry {
    pub name: String,
    pub path: PathBuf,
    /// Regular files directly inside the folder.
    pub file_count: usize,
}

/// GET /api/datasets?path=
pub async fn list_datasets(
    State(state): State<AppState>,
    Query(query): Query<DatasetQuery>,
) -> AppResult<Json<DataResponse<Vec<DatasetEntry>>>> {
    let root = state.config.dataset_listing_root.clone();

    let entries = tokio::task::spawn_blocking(move || list_dir(&root, query.path.as_deref()))
        .await
        .map_err(|e| AppError::InternalError(format!("Dataset listing task failed: {e}")))??;

    Ok(Json(DataResponse { data: entries }))
}

fn list_dir(root: &Path, sub: Option<&str>) -> Result<Vec<DatasetEntry>, CoreError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let target = match sub.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sub) => {
            let candidate = expand_user(sub);
            let candidate = if candidate.is_absolute() {
                candidate
            } else {
                root.join(candidate)
            };
            let target = ensure_contained(&candidate, root)?;
            if !target.is_dir() {
                return Err(CoreError::NotFound(format!(
                    "Dataset folder does not exist: {}",
                    target.display()
                )));
            }
            target
        }
        None => root.to_path_buf(),
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(&target)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        let file_count = std::fs::read_dir(&path)?
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .count();
        entries.push(DatasetEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            file_count,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Where an added image came from.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Comfyui,
    Manual,
    Other,
}

#[derive(Debug, Deserialize)]
pub struct DatasetAddRequest {
    /// Must match the path segment when given.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Relative to the dataset root; empty means the root itself.
    #[serde(default)]
    pub dataset_path: String,
    /// Existing file to copy when `image_data` is absent.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Base64-encoded image bytes.
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub source: Option<ImageSource>,
}

#[derive(Debug, Serialize)]
pub struct DatasetAddResponse {
    pub status: &'static str,
    pub dataset_path: PathBuf,
    pub file_name: String,
    /// Regular files in the dataset after the write.
    pub count: usize,
}

/// POST /api/models/{model_id}/dataset/add
pub async fn add_dataset_image(
    State(state): State<AppState>,
    UrlPath(model_id): UrlPath<String>,
    Json(body): Json<DatasetAddRequest>,
) -> AppResult<impl IntoResponse> {
    if let Some(body_id) = body.model_id.as_deref().filter(|id| !id.is_empty()) {
        if body_id != model_id {
            return Err(AppError::BadRequest("model_id mismatch.".to_string()));
        }
    }
    if !is_safe_component(&model_id) {
        return Err(CoreError::InvalidArgument(format!("Invalid model_id: '{model_id}'")).into());
    }

    let root = state.config.dataset_listing_root.clone();
    let saved = tokio::task::spawn_blocking(move || save_image(&root, &model_id, &body))
        .await
        .map_err(|e| AppError::InternalError(format!("Dataset write task failed: {e}")))??;

    tracing::info!(
        dataset_path = %saved.dataset_path.display(),
        file_name = %saved.file_name,
        count = saved.count,
        "Dataset image saved",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: saved })))
}

fn save_image(
    root: &Path,
    model_id: &str,
    body: &DatasetAddRequest,
) -> AppResult<DatasetAddResponse> {
    std::fs::create_dir_all(root).map_err(CoreError::from)?;
    let root = resolve(root)?;
    let root = root.as_path();

    let sub = body.dataset_path.trim();
    let candidate = if sub.is_empty() {
        root.to_path_buf()
    } else {
        let candidate = expand_user(sub);
        if candidate.is_absolute() {
            candidate
        } else {
            root.join(candidate)
        }
    };
    let dataset_dir = ensure_contained(&candidate, root)?;

    let file_name = format!("{model_id}-{}.png", uuid::Uuid::new_v4().simple());
    let destination = dataset_dir.join(&file_name);

    match (body.image_data.as_deref(), body.image_path.as_deref()) {
        (Some(data), _) if !data.trim().is_empty() => {
            let bytes = STANDARD
                .decode(data.trim())
                .map_err(|_| AppError::BadRequest("Invalid base64 image data.".to_string()))?;
            std::fs::create_dir_all(&dataset_dir).map_err(CoreError::from)?;
            std::fs::write(&destination, bytes).map_err(CoreError::from)?;
        }
        (_, Some(source)) if !source.trim().is_empty() => {
            let source = expand_user(source);
            if !source.is_file() {
                return Err(CoreError::NotFound(format!(
                    "Source image not found: {}",
                    source.display()
                ))
                .into());
            }
            std::fs::create_dir_all(&dataset_dir).map_err(CoreError::from)?;
            std::fs::copy(&source, &destination).map_err(CoreError::from)?;
        }
        _ => {
            return Err(AppError::BadRequest(
                "Either image_data or image_path is required.".to_string(),
            ));
        }
    }

    let count = std::fs::read_dir(&dataset_dir)
        .map_err(CoreError::from)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .count();

    Ok(DatasetAddResponse {
        status: "saved",
        dataset_path: dataset_dir,
        file_name,
        count,
    })
}
