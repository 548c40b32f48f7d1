//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use folio_core::{Classify, ErrorClass};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// The request itself could not be read: bad body, path or query string.
  #[error("invalid request: {0}")]
  Invalid(String),

  #[error("authentication credentials were not provided")]
  Unauthenticated,

  #[error("store error: {message}")]
  Store { class: ErrorClass, message: String },
}

impl ApiError {
  /// Wrap a store failure, keeping its classification.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify,
  {
    let class = err.class();
    if class == ErrorClass::Internal {
      tracing::error!(error = %err, "store failure");
    }
    ApiError::Store { class, message: err.to_string() }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::Invalid(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::Invalid(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::Invalid(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, message) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
      ApiError::Invalid(m) => (
        StatusCode::BAD_REQUEST,
        ErrorClass::Validation.code(),
        m,
      ),
      ApiError::Unauthenticated => (
        StatusCode::UNAUTHORIZED,
        "not_authenticated",
        "authentication credentials were not provided".to_string(),
      ),
      ApiError::Store { class, message } => {
        let status = match class {
          ErrorClass::NotFound => StatusCode::NOT_FOUND,
          ErrorClass::Validation => StatusCode::BAD_REQUEST,
          ErrorClass::Conflict => StatusCode::CONFLICT,
          ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Storage faults are logged above, not echoed to clients.
        let message = if class == ErrorClass::Internal {
          "internal server error".to_string()
        } else {
          message
        };
        (status, class.code(), message)
      }
    };
    (status, Json(json!({ "error": code, "message": message }))).into_response()
  }
}
