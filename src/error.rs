//! Error types for the contact intake service.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Caller-correctable problems with a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name, email, and message are required.")]
    MissingField,

    #[error("Please provide a valid email address.")]
    InvalidEmail,
}

/// Mail transport failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP relay error: {0}")]
    Relay(String),

    #[error("SMTP send failed: {0}")]
    SendFailed(String),

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    #[error("Send task aborted: {0}")]
    Join(String),
}

/// Terminal outcome of a failed submission.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Rate limited: source {source_id} exceeded {quota} submissions per window")]
    RateLimited { source_id: String, quota: u32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Mail transport is not configured: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] TransportError),
}

impl IntakeError {
    /// HTTP status the caller receives for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Server-side failures never carry detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::RateLimited { .. } => "Too many requests. Please try again later.".to_string(),
            Self::Validation(e) => e.to_string(),
            Self::Configuration(_) => {
                "Server configuration error. Please try again later.".to_string()
            }
            Self::Delivery(_) => "Failed to send message. Please try again later.".to_string(),
        }
    }
}

/// JSON body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
