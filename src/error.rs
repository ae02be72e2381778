//! Error types
//!
//! `UpstreamError` covers everything that can go wrong while talking to a data
//! provider; the proxy recovers from it with a sample payload. `AppError` is
//! what a handler returns for anything else, rendered as HTTP 500.

use std::any::Any;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::StatusCode as UpstreamStatus;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when fetching from an upstream provider
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream {url} returned {status}")]
    Status { url: String, status: UpstreamStatus },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Upstream did not answer in time
    #[error("Upstream did not answer within {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced to the HTTP caller
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON body for every 500 response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Converts a handler panic into the same 500 body as `AppError`
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };

    AppError::Internal(message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("Body should be JSON")
    }

    #[tokio::test]
    async fn test_app_error_renders_500_with_message() {
        let response = AppError::Internal("cache poisoned".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal error: cache poisoned");
    }

    #[tokio::test]
    async fn test_panic_response_uses_panic_message() {
        let response = panic_response(Box::new("boom"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal error: boom");
    }

    #[tokio::test]
    async fn test_panic_response_with_owned_string() {
        let response = panic_response(Box::new(String::from("index out of bounds")));

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal error: index out of bounds");
    }

    #[test]
    fn test_timeout_error_message() {
        let err = UpstreamError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Upstream did not answer within 10s");
    }

    #[test]
    fn test_status_error_message() {
        let err = UpstreamError::Status {
            url: "https://ergast.com/api/f1/circuits.json".to_string(),
            status: UpstreamStatus::SERVICE_UNAVAILABLE,
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("circuits.json"));
    }
}
