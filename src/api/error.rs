//! HTTP error responses
//!
//! [`ApiError`] pairs an [`ImagingError`] with the endpoint and request that produced it.
//! Client errors (4xx) answer with the user-facing message only. Server errors (5xx)
//! answer with the endpoint's failure summary, the underlying message as `details`, the
//! request id and a timestamp.

use super::Endpoint;
use crate::error::ImagingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{SecondsFormat, Utc};
use instant::Duration;
use serde::Serialize;

/// JSON error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// An [`ImagingError`] on its way out of a handler
#[derive(Debug)]
pub struct ApiError {
    pub error: ImagingError,
    pub endpoint: Endpoint,
    pub request_id: Option<String>,
    /// Time spent on the request before it failed
    pub elapsed: Option<Duration>,
}

impl ApiError {
    #[must_use]
    pub fn new(error: ImagingError, endpoint: Endpoint) -> Self {
        Self {
            error,
            endpoint,
            request_id: None,
            elapsed: None,
        }
    }

    #[must_use]
    pub fn with_request(mut self, request_id: &str, elapsed: Duration) -> Self {
        self.request_id = Some(request_id.to_string());
        self.elapsed = Some(elapsed);
        self
    }

    /// HTTP status for the wrapped error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Message safe to show to the client for 4xx responses
    #[must_use]
    pub fn user_message(&self) -> String {
        match &self.error {
            ImagingError::MissingInput { field } => match field.as_str() {
                "images" => "No images uploaded".to_string(),
                "product" | "background" => {
                    "Both product and background images are required".to_string()
                },
                _ => "No image uploaded".to_string(),
            },
            ImagingError::InvalidParameters(message) | ImagingError::InvalidBatchRequest(message) => {
                message.clone()
            },
            other => other.to_string(),
        }
    }

    fn body(&self) -> ErrorBody {
        if self.status_code().is_server_error() {
            ErrorBody {
                success: false,
                error: self.endpoint.failure_summary().to_string(),
                details: Some(self.error.to_string()),
                request_id: self.request_id.clone(),
                timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            }
        } else {
            ErrorBody {
                success: false,
                error: self.user_message(),
                details: None,
                request_id: None,
                timestamp: None,
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = self.request_id.as_deref().unwrap_or("-");
        let elapsed_ms = self.elapsed.map_or(0, |d| d.as_millis() as u64);
        let endpoint = self.endpoint.name();

        // Log full error details, level by severity
        match &self.error {
            ImagingError::PayloadTooLarge { .. } | ImagingError::ProviderNotConfigured(_) => {
                tracing::warn!(request_id, endpoint, error = %self.error, "Request rejected");
            },
            error if error.is_client_error() => {
                tracing::debug!(request_id, endpoint, error = %self.error, "Client error");
            },
            _ => {
                tracing::error!(
                    request_id,
                    endpoint,
                    elapsed_ms,
                    error = %self.error,
                    "Request failed"
                );
            },
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}
