//! Route definitions for the `/jobs` resource (training jobs).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::training;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// GET    /{id}            -> get_job
/// POST   /{id}/cancel     -> cancel_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(training::list_jobs))
        .route("/{id}", get(training::get_job))
        .route("/{id}/cancel", post(training::cancel_job))
}
