//! Error types for sheet-relay
//!
//! Every failure of a conversion run ends up as one [`Error`] carrying the
//! failing stage and whatever diagnostics the remote side returned. Hosts
//! that want a flat, serializable object convert it into a
//! [`FailureReport`].

use crate::types::Stage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for sheet-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sheet-relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "authHeader")
        key: Option<String>,
    },

    /// A configured URL is not a well-formed http(s) URL
    #[error("invalid {field}: '{url}' is not a valid http(s) URL")]
    InvalidUrl {
        /// Which setting held the URL ("service endpoint" or "file URL")
        field: &'static str,
        /// The rejected value
        url: String,
    },

    /// Input rejected before or between remote calls (empty lists, bad sheet index)
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection refused, DNS failure, timeout, or a body that could not be read
    #[error("{stage} failed: could not reach {endpoint}: {message}")]
    Transport {
        /// Stage that issued the request
        stage: Stage,
        /// Request URL
        endpoint: String,
        /// Underlying transport error
        message: String,
        /// True when the request hit its timeout
        timed_out: bool,
    },

    /// Non-2xx HTTP response
    #[error("{stage} failed: {endpoint} returned {status} {status_text}: {body}")]
    Service {
        /// Stage that issued the request
        stage: Stage,
        /// Request URL
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase of the status code
        status_text: String,
        /// Response body, as returned
        body: String,
    },

    /// 2xx response whose body does not have the expected shape
    #[error("{stage} failed: unexpected response from {endpoint}: {message}")]
    Shape {
        /// Stage that issued the request
        stage: Stage,
        /// Request URL
        endpoint: String,
        /// What was wrong with the body
        message: String,
        /// Raw response body for diagnostics
        body: Option<String>,
    },

    /// Downloaded file exceeds the upload cap
    #[error("file too large: {size_bytes} bytes exceeds the {limit_bytes} byte limit")]
    SizeLimit {
        /// Size reported by content-length, or the downloaded byte count
        size_bytes: u64,
        /// Maximum accepted size
        limit_bytes: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Stage the error belongs to, if it came from a remote call
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Transport { stage, .. }
            | Error::Service { stage, .. }
            | Error::Shape { stage, .. } => Some(*stage),
            Error::InvalidUrl { .. } => Some(Stage::Validating),
            Error::SizeLimit { .. } => Some(Stage::Downloading),
            _ => None,
        }
    }

    pub(crate) fn shape(
        stage: Stage,
        endpoint: impl Into<String>,
        message: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Error::Shape {
            stage,
            endpoint: endpoint.into(),
            message: message.into(),
            body,
        }
    }
}

/// Flat failure object handed to the host when a run aborts
///
/// # Example JSON
///
/// ```json
/// {
///   "message": "upload failed: http://svc/upload returned 503 Service Unavailable: busy",
///   "http_code": 503,
///   "status_text": "Service Unavailable",
///   "stage": "uploading"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailureReport {
    /// Human-readable description of what went wrong
    pub message: String,

    /// HTTP status returned by the remote side, 0 when not applicable
    pub http_code: u16,

    /// Reason phrase matching `http_code`, empty when not applicable
    pub status_text: String,

    /// Stage in which the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl From<Error> for FailureReport {
    fn from(error: Error) -> Self {
        let stage = error.stage();
        let (http_code, status_text) = match &error {
            Error::Service {
                status,
                status_text,
                ..
            } => (*status, status_text.clone()),
            _ => (0, String::new()),
        };

        FailureReport {
            message: error.to_string(),
            http_code,
            status_text,
            stage,
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidUrl { .. } => 400,

            // 422 Unprocessable Entity - Semantic errors
            Error::Validation(_) => 422,

            // 413 Payload Too Large
            Error::SizeLimit { .. } => 413,

            // 504 Gateway Timeout
            Error::Transport {
                timed_out: true, ..
            } => 504,

            // 502 Bad Gateway - External service errors
            Error::Transport { .. } => 502,
            Error::Service { .. } => 502,
            Error::Shape { .. } => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::Validation(_) => "validation_error",
            Error::Transport {
                timed_out: true, ..
            } => "timeout",
            Error::Transport { .. } => "transport_error",
            Error::Service { .. } => "service_error",
            Error::Shape { .. } => "unexpected_response",
            Error::SizeLimit { .. } => "file_too_large",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}
