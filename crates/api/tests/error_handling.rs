//! `AppError` to HTTP response mapping, without a server.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use nova_api::error::AppError;
use nova_core::error::CoreError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn core_errors_map_to_status_and_code() {
    let cases = [
        (CoreError::Config("no template".into()), StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        (CoreError::NotFound("Dataset path does not exist: /x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
        (CoreError::InvalidArgument("bad id".into()), StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        (CoreError::Parse("bad json".into()), StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR"),
        (CoreError::Engine("CUDA out of memory".into()), StatusCode::BAD_GATEWAY, "ENGINE_ERROR"),
        (CoreError::Spawn("no python".into()), StatusCode::BAD_GATEWAY, "SPAWN_ERROR"),
        (CoreError::Timeout("too slow".into()), StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        (CoreError::Cancelled("shutting down".into()), StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
    ];

    for (err, expected_status, expected_code) in cases {
        let message = err.to_string();
        let (status, json) = error_to_response(AppError::Core(err)).await;
        assert_eq!(status, expected_status, "{message}");
        assert_eq!(json["code"], expected_code);
        assert!(message.ends_with(json["error"].as_str().unwrap()));
    }
}

#[tokio::test]
async fn engine_detail_is_passed_through() {
    let (_, json) =
        error_to_response(AppError::Core(CoreError::Engine("CUDA out of memory".into()))).await;
    assert_eq!(json["error"], "CUDA out of memory");
}

#[tokio::test]
async fn io_error_is_sanitized() {
    let err = CoreError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "/secret/path",
    ));
    let (status, json) = error_to_response(AppError::Core(err)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "IO_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("invalid field value".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "invalid field value");
}

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let (status, json) =
        error_to_response(AppError::InternalError("secret credentials".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
