// errors.rs
// Error taxonomy for the billing core, mapped onto HTTP at the axum
// boundary. Validation and not-found failures carry enough detail to fix
// the request; internal failures are logged and surfaced opaquely.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    InvalidInput(String),

    #[error("reference code {0} has already been used")]
    DuplicateReference(String),

    #[error("{0}")]
    AlreadyProcessed(String),

    #[error("invoice rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<bson::ser::Error> for ApiError {
    fn from(err: bson::ser::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

/// True when a MongoDB write failed on a unique-index violation (E11000).
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteError, WriteFailure};
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(rename = "missingFields", skip_serializing_if = "Option::is_none")]
    missing_fields: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, missing) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string(), None),
            ApiError::MissingFields(ref fields) => (
                StatusCode::BAD_REQUEST,
                "Missing required fields".to_string(),
                Some(fields.clone()),
            ),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string(), None),
            ApiError::DuplicateReference(_) => (StatusCode::CONFLICT, self.to_string(), None),
            ApiError::AlreadyProcessed(_) => (StatusCode::CONFLICT, self.to_string(), None),
            ApiError::Render(_) => (StatusCode::BAD_GATEWAY, self.to_string(), None),
            ApiError::Internal(ref err) => {
                error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            success: false,
            message,
            missing_fields: missing,
        };
        (status, Json(body)).into_response()
    }
}
