//! HTTP-facing error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billsplit_ocr::{OcrError, PipelineError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Preprocess(e) => AppError::UnreadableImage(e.to_string()),
            PipelineError::Ocr(OcrError::ImageDecode(msg)) => AppError::UnreadableImage(msg),
            PipelineError::Ocr(e) => AppError::Ocr(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::OcrUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "ocr_unavailable"),
            AppError::UnreadableImage(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unreadable_image"),
            AppError::Ocr(e) => {
                tracing::error!("OCR failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "ocr_failed")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorResponse { error, message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
