//! Error types for qrmint-web
//!
//! `Error` covers generation, archive and storage failures inside the service.
//! `ApiError` is the HTTP face used by the JSON and asset endpoints; the HTML
//! form endpoints turn failures into redirect notices instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for qrmint-web
#[derive(Error, Debug)]
pub enum Error {
    /// Payload could not be encoded as a QR symbol
    #[error("QR encoding error: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// Raster or PNG processing errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Zip archive construction errors
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Artifact store errors
    #[error("Storage error: {0}")]
    Store(#[from] qrmint_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience Result type using qrmint-web Error
pub type Result<T> = std::result::Result<T, Error>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(#[from] Error),
}

impl From<qrmint_common::Error> for ApiError {
    fn from(err: qrmint_common::Error) -> Self {
        ApiError::Internal(Error::Store(err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(Error::Task(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Internal(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
