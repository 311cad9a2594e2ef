//! HTTP error mapping for saga endpoints.
//!
//! Every failure leaves the API as a `{ code, message }` JSON body. A pending
//! payment is not a failure: `StillPending` maps to `202 Accepted` and tells
//! the client when to look again.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::registration::RegistrationError;

/// Standard error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Seconds to wait before retrying, for pending payments and rate limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

/// API error wrapper that converts registration errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub RegistrationError);

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RegistrationError::Validation { .. }
            | RegistrationError::InvalidProviderParams { .. } => StatusCode::BAD_REQUEST,
            RegistrationError::ResumeRejected | RegistrationError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            RegistrationError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
            RegistrationError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistrationError::Conflict { .. } | RegistrationError::VersionConflict(_) => {
                StatusCode::CONFLICT
            }
            RegistrationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            RegistrationError::ProviderInitiationFailed { .. } => StatusCode::BAD_GATEWAY,
            RegistrationError::StillPending { .. } => StatusCode::ACCEPTED,
            RegistrationError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match &self.0 {
            RegistrationError::StillPending {
                retry_after_secs, ..
            }
            | RegistrationError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = %self.0.code(), "Request failed: {}", self.0);
        }

        // Infrastructure details stay in the logs.
        let message = match &self.0 {
            RegistrationError::Infrastructure(_) => "Internal server error".to_string(),
            other => other.message(),
        };

        let mut body = ErrorResponse::new(self.0.code().to_string(), message);
        let retry_after = self.retry_after_secs();
        if let Some(secs) = retry_after {
            body = body.with_retry_after(secs);
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
