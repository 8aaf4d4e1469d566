//! HTTP mapping for [`Error`].
//!
//! Missing records map to 404, rejected input and rejected graph mutations to 400,
//! deleting a product that is still in use to 409, and everything else to 500. Server
//! errors are logged here and answered with a generic message.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status reason (e.g. "Not Found")
    pub error: String,
    /// Human-readable description
    pub message: String,
    /// Offending request field, for invalid arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound { .. } | Self::ComponentNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidArgument { .. }
            | Self::CycleDetected { .. }
            | Self::DuplicateComponent { .. }
            | Self::DepthExceeded { .. }
            | Self::CostOverflow { .. } => StatusCode::BAD_REQUEST,
            Self::ProductInUse { .. } => StatusCode::CONFLICT,
            Self::GraphCorrupted { .. }
            | Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        };
        let field = match &self {
            Self::InvalidArgument { field, .. } => Some((*field).to_string()),
            _ => None,
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid("path", rejection.body_text())
    }
}
