//! HTTP error response handling for the API
//!
//! Failed runs answer with the status from [`ToHttpStatus`] and a JSON body
//! wrapping the [`FailureReport`].

use crate::error::{Error, FailureReport, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by the API
///
/// ```json
/// {
///   "code": "service_error",
///   "error": {
///     "message": "upload failed: ...",
///     "http_code": 503,
///     "status_text": "Service Unavailable",
///     "stage": "uploading"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "validation_error", "timeout")
    pub code: String,
    /// Failure details
    pub error: FailureReport,
}

impl From<Error> for ErrorResponse {
    fn from(error: Error) -> Self {
        Self {
            code: error.error_code().to_string(),
            error: error.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status_code, Json(ErrorResponse::from(self))).into_response()
    }
}
