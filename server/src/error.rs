use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use u2net_extractor::ExtractError;

/// Errors surfaced to HTTP clients as JSON `{"detail": ...}` bodies.
///
/// Client-input problems map to 400; pipeline faults and timeouts map
/// to 500. No partial image is ever returned on failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("File must be an image")]
    NotAnImage,

    #[error("multipart payload has no file field")]
    MissingFile,

    #[error("invalid multipart payload: {0}")]
    BadUpload(String),

    #[error("{0}")]
    InvalidImage(String),

    #[error("Error processing image: {0}")]
    Processing(String),

    #[error("inference timed out")]
    Timeout,
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        if err.is_client_error() {
            Self::InvalidImage(err.to_string())
        } else {
            Self::Processing(err.to_string())
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAnImage | Self::MissingFile | Self::BadUpload(_) | Self::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Processing(_) | Self::Timeout => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}
