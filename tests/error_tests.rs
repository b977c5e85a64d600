// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use ride_dispatch::error::AppError;

#[test]
fn test_only_store_outages_are_retryable() {
    assert!(AppError::Unavailable("timeout".to_string()).is_retryable());

    assert!(!AppError::Conflict("stale".to_string()).is_retryable());
    assert!(!AppError::NotFound("ride".to_string()).is_retryable());
    assert!(!AppError::Internal(anyhow::anyhow!("boom")).is_retryable());
}

#[test]
fn test_is_conflict() {
    assert!(AppError::Conflict("Ride r1 is accepted, expected offered".to_string()).is_conflict());
    assert!(!AppError::Forbidden("not yours".to_string()).is_conflict());
    assert!(!AppError::Unavailable("down".to_string()).is_conflict());
}

#[test]
fn test_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
        (AppError::Forbidden("x".to_string()), StatusCode::FORBIDDEN),
        (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
        (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
        (AppError::Conflict("x".to_string()), StatusCode::CONFLICT),
        (
            AppError::Unavailable("x".to_string()),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
        (
            AppError::Internal(anyhow::anyhow!("x")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(err.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_unavailable_hides_details() {
    let response =
        AppError::Unavailable("connection refused to 10.0.0.3".to_string()).into_response();
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(body["error"], "store_unavailable");
    assert!(body.get("details").is_none() || body["details"].is_null());
}
