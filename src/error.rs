//! Error types and their HTTP mapping.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Malformed or incomplete MCQ candidate (or generation request).
/// User-correctable; reported with the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
  pub field: &'static str,
  pub message: String,
}

impl ValidationError {
  pub fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self { field, message: message.into() }
  }
}

/// I/O failure reading or writing the persisted document.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("store document is malformed: {0}")]
  Json(#[from] serde_json::Error),
}

/// Failure of a single-record ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
  #[error(transparent)]
  Invalid(#[from] ValidationError),
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// The external model call failed or returned unusable content.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("question generation is not configured")]
  Disabled,
  #[error("model request failed: {0}")]
  Upstream(String),
  #[error("model reply contained no JSON array")]
  NoArray,
  #[error("model reply could not be parsed: {0}")]
  Parse(String),
  #[error("model reply contained no usable questions")]
  Empty,
}

/// Rejected session transitions. The session stays usable after any of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("no question is currently displayed")]
  NoQuestion,
  #[error("question {0} has already been answered")]
  AlreadyAnswered(usize),
  #[error("option {0} does not exist")]
  InvalidOption(usize),
  #[error("select a subject first")]
  NoSubject,
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error("{0}")]
  BadRequest(String),
}

impl From<IngestError> for ApiError {
  fn from(e: IngestError) -> Self {
    match e {
      IngestError::Invalid(v) => ApiError::Validation(v),
      IngestError::Store(s) => ApiError::Store(s),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Validation(e) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": e.message, "field": e.field })),
      )
        .into_response(),
      ApiError::BadRequest(message) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
      }
      ApiError::Store(e) => {
        // Details stay in the logs; the client gets a generic message.
        error!(target: "etea_backend", error = %e, "Storage failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "message": "Failed to access the question bank. Please try again." })),
        )
          .into_response()
      }
      ApiError::Generation(GenerationError::Disabled) => (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "Question generation is not available on this server." })),
      )
        .into_response(),
      ApiError::Generation(e) => {
        error!(target: "generation", error = %e, "Generation failed");
        (
          StatusCode::BAD_GATEWAY,
          Json(json!({ "message": "Failed to generate questions. Please try again." })),
        )
          .into_response()
      }
    }
  }
}
