use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nova_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from the engine client or training supervisor.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a [`CoreError`] to an HTTP status, error code, and message.
///
/// Configuration problems keep their message since an operator can act on
/// it. Local I/O failures are logged and sanitized.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    let (status, message) = match err {
        CoreError::Config(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        CoreError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
        CoreError::InvalidArgument(m) => (StatusCode::BAD_REQUEST, m.clone()),
        CoreError::Parse(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
        CoreError::Engine(m) | CoreError::Spawn(m) => (StatusCode::BAD_GATEWAY, m.clone()),
        CoreError::Timeout(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
        CoreError::Cancelled(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
        CoreError::Io(e) => {
            tracing::error!(error = %e, "I/O error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    };

    if status.is_server_error() && !matches!(err, CoreError::Io(_)) {
        tracing::warn!(code = err.code(), error = %message, "Request failed");
    }

    (status, err.code(), message)
}
