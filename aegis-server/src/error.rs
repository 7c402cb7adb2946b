//! Error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// A failed request, rendered as `{ "error": ..., "details"?: ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("{message}: {details}")]
    Internal { message: String, details: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>, details: impl ToString) -> Self {
        ApiError::Internal {
            message: message.into(),
            details: details.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::BadRequest(message) => json!({ "error": message }),
            ApiError::InvalidJson(details) => {
                json!({ "error": "Invalid JSON body", "details": details })
            }
            ApiError::Internal { message, details } => {
                json!({ "error": message, "details": details })
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Same as [`ApiError`] with `success: false` added, for the analysis routes
/// whose success bodies carry a `success` flag.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct AnalysisError(#[from] pub ApiError);

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let mut body = self.0.body();
        body["success"] = Value::Bool(false);
        (self.0.status(), Json(body)).into_response()
    }
}

/// Failure to bring the server up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind listener: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid backend configuration: {0}")]
    Backend(#[from] aegis_client::ClientError),
}
