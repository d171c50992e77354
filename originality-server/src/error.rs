//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use originality_core::OriginalityError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Payload too large - upload exceeds the configured size
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Engine error from the matching library
    #[error("Engine error: {0}")]
    Engine(#[from] OriginalityError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a payload too large error
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Engine(ref e) => match e {
                // Client-provided invalid input → 400
                OriginalityError::InputError(_) | OriginalityError::UnsupportedFormat(_) => {
                    StatusCode::BAD_REQUEST
                }

                // Well-formed upload with unreadable content → 422
                OriginalityError::DecodeError(_) | OriginalityError::ExtractionError(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }

                // External service failures → 503
                OriginalityError::DelegateUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                OriginalityError::HttpError(_) => StatusCode::SERVICE_UNAVAILABLE,

                // Internal processing failures → 500
                OriginalityError::StorageError(_)
                | OriginalityError::SerializationError(_)
                | OriginalityError::EmbeddingError(_)
                | OriginalityError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            Self::Engine(ref e) => match e {
                OriginalityError::InputError(_) => "INVALID_INPUT",
                OriginalityError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
                OriginalityError::DecodeError(_) => "DECODE_ERROR",
                OriginalityError::ExtractionError(_) => "EXTRACTION_ERROR",
                OriginalityError::StorageError(_) => "STORAGE_ERROR",
                OriginalityError::DelegateUnavailable { .. } => "DELEGATE_UNAVAILABLE",
                OriginalityError::SerializationError(_) => "SERIALIZATION_ERROR",
                OriginalityError::EmbeddingError(_) => "EMBEDDING_ERROR",
                OriginalityError::HttpError(_) => "UPSTREAM_ERROR",
                OriginalityError::Io(_) => "IO_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Engine(ref e) => match e {
                // Input problems are safe to echo back
                OriginalityError::InputError(msg)
                | OriginalityError::UnsupportedFormat(msg)
                | OriginalityError::DecodeError(msg)
                | OriginalityError::ExtractionError(msg) => msg.clone(),
                OriginalityError::DelegateUnavailable { service, .. } => {
                    format!("{service} service unavailable")
                }
                OriginalityError::StorageError(_) => "Fingerprint store error".to_string(),
                OriginalityError::SerializationError(_) => {
                    "Fingerprint serialization error".to_string()
                }
                OriginalityError::EmbeddingError(_) => "Embedding computation failed".to_string(),
                OriginalityError::HttpError(_) => "Upstream service error".to_string(),
                OriginalityError::Io(_) => "Internal I/O error".to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Engine(_) => "engine",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
