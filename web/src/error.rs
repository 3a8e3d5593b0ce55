//! Error types for web handlers.
//!
//! This module bridges the typed errors of the core and runtime crates to
//! HTTP responses through Axum's `IntoResponse` trait. The body is always
//! `{"code": ..., "message": ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventpass_core::code::CodeError;
use eventpass_core::record_store::RecordStoreError;
use eventpass_runtime::StoreError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<SessionView>, AppError> {
///     let session = sessions.get(id)
///         .ok_or_else(|| AppError::not_found("Session", id))?;
///     Ok(Json(view(session).await))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response this error produces.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Record store failures on the request path.
///
/// Duplicates and unknown identifiers are client errors; everything else
/// means the store is unreachable or unhealthy.
impl From<RecordStoreError> for AppError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::AlreadyExists { .. } => Self::conflict(err.to_string()),
            RecordStoreError::NotFound { ref identifier } => {
                Self::not_found("Registration", identifier)
            },
            RecordStoreError::Database(_) | RecordStoreError::Corrupt(_) => {
                Self::unavailable("The record store is unavailable").with_source(err.into())
            },
        }
    }
}

/// Encoding failures: unsupported identifiers are the caller's fault, a
/// failed raster is ours.
impl From<CodeError> for AppError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::Unsupported { .. } => Self::validation(err.to_string()),
            CodeError::Render(_) => {
                Self::internal("Failed to render the pass image").with_source(err.into())
            },
        }
    }
}

/// Session runtime failures.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::unavailable("Timed out waiting for the record store"),
            StoreError::ShutdownInProgress | StoreError::ShutdownTimeout(_) => {
                Self::unavailable("The service is shutting down")
            },
            other => Self::internal("An internal error occurred").with_source(other.into()),
        }
    }
}
