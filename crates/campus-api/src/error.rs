//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{"error": "<message>"}`. Upstream
//! causes are logged where they occur and never reach the client.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use campus_core::error::CampusError;

/// Message returned for any rejected `/ask` payload.
pub const NO_MESSAGE: &str = "No message provided";

/// Message returned when a request body exceeds the configured limit.
pub const TOO_LARGE: &str = "Message too large";

/// Message returned when the assistant or its stores are failing.
pub const UNAVAILABLE: &str = "The assistant is unavailable right now. Please try again.";

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - unusable input.
    BadRequest(String),
    /// 413 Payload Too Large - body over `server.body_limit_bytes`.
    PayloadTooLarge,
    /// 429 Too Many Requests.
    TooManyRequests,
    /// 500 Internal Server Error - a fault in this process.
    Internal(String),
    /// 503 Service Unavailable - the agent or a store behind it failed.
    ServiceUnavailable,
}

impl ApiError {
    pub fn no_message() -> Self {
        ApiError::BadRequest(NO_MESSAGE.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, TOO_LARGE.to_string()),
            ApiError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE.to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<CampusError> for ApiError {
    fn from(err: CampusError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::no_message()
        }
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(err: minijinja::Error) -> Self {
        ApiError::Internal(format!("template error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_body() {
        let (status, json) = body_json(ApiError::no_message()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, serde_json::json!({"error": "No message provided"}));
    }

    #[tokio::test]
    async fn test_unavailable_hides_cause() {
        let (status, json) = body_json(ApiError::ServiceUnavailable).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let err: ApiError = CampusError::Storage("disk I/O error at /var/db".to_string()).into();
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!json["error"].as_str().unwrap().contains("/var/db"));
    }

    #[tokio::test]
    async fn test_rate_limited_body() {
        let (status, json) = body_json(ApiError::TooManyRequests).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"], "Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_payload_too_large_body() {
        let (status, json) = body_json(ApiError::PayloadTooLarge).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json, serde_json::json!({"error": "Message too large"}));
    }
}
