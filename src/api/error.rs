use crate::services::compression::ProcessingError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Client-facing message for every server-side processing failure
pub const PROCESSING_FAILED: &str = "Failed to process PDF";

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Processing(ProcessingError::MissingInput) => {
                (StatusCode::BAD_REQUEST, "No file uploaded".to_string())
            }
            AppError::Processing(ProcessingError::InvalidFileType(content_type)) => {
                tracing::warn!("Rejected upload with content type '{}'", content_type);
                (StatusCode::BAD_REQUEST, "Only PDFs are allowed".to_string())
            }
            AppError::Processing(e) => {
                tracing::error!("Error during file upload: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
