//! Error types for fra-pv HTTP handlers
//!
//! Every error renders as `{"success": false, "error": <message>, "error_code": <CODE>}`.

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::uploads::ALLOWED_EXTENSIONS;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Multipart body has no `file` part
    #[error("No file provided")]
    NoFile,

    /// `file` part present with an empty file name
    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type. Allowed: {}", allowed_types())]
    InvalidFileType,

    /// Upload exceeds the configured body limit (413)
    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Too many files: maximum {0} per batch")]
    TooManyFiles(usize),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Verification not found: {0}")]
    VerificationNotFound(String),

    /// Document text could not be extracted (422)
    #[error("Failed to extract data: {0}")]
    ExtractionFailed(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// fra-common error
    #[error("{0}")]
    Common(#[from] fra_common::Error),
}

fn allowed_types() -> String {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|e| e.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NoFile => (StatusCode::BAD_REQUEST, "NO_FILE"),
            ApiError::NoFileSelected => (StatusCode::BAD_REQUEST, "NO_FILE_SELECTED"),
            ApiError::InvalidFileType => (StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE"),
            ApiError::FileTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            ApiError::TooManyFiles(_) => (StatusCode::BAD_REQUEST, "TOO_MANY_FILES"),
            ApiError::FileNotFound(_) => (StatusCode::NOT_FOUND, "FILE_NOT_FOUND"),
            ApiError::VerificationNotFound(_) => (StatusCode::NOT_FOUND, "VERIFICATION_NOT_FOUND"),
            ApiError::ExtractionFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_FAILED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Common(fra_common::Error::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Common(fra_common::Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::FileTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_code, "Request failed");
        } else {
            tracing::debug!(error = %self, error_code, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "error_code": error_code,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        assert_eq!(ApiError::NoFile.status_and_code(), (StatusCode::BAD_REQUEST, "NO_FILE"));
        assert_eq!(
            ApiError::FileTooLarge("limit".into()).status_and_code(),
            (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE")
        );
        assert_eq!(
            ApiError::Common(fra_common::Error::NotFound("x".into())).status_and_code().0,
            StatusCode::NOT_FOUND
        );
        // Storage and database failures arrive through fra-common
        assert_eq!(
            ApiError::Common(fra_common::Error::Internal("x".into())).status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR")
        );
    }

    #[test]
    fn test_invalid_file_type_lists_extensions() {
        assert_eq!(
            ApiError::InvalidFileType.to_string(),
            "Invalid file type. Allowed: PDF, PNG, JPG, JPEG, TIFF, BMP, TXT"
        );
    }
}
