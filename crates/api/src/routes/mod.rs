pub mod health;
pub mod jobs;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /generate-image        run generation workflow (POST)
/// /upscale               run upscale workflow (POST)
/// /train-lora            launch training (POST)
/// /jobs                  training jobs (see jobs::router)
/// /datasets              list dataset folders (GET)
/// /models/{model_id}/dataset/add
///                        add an image to a dataset (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-image", post(handlers::generation::generate_image))
        .route("/upscale", post(handlers::generation::upscale_image))
        .route("/train-lora", post(handlers::training::train_lora))
        .route("/datasets", get(handlers::datasets::list_datasets))
        .route(
            "/models/{model_id}/dataset/add",
            post(handlers::datasets::add_dataset_image),
        )
        .nest("/jobs", jobs::router())
}
