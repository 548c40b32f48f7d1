//! Error types for `folio-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: Uuid },

  #[error("invalid data: {0}")]
  Validation(String),

  /// Soft-delete refused because live records still reference the target.
  #[error("{kind} {id} has dependents")]
  HasDependents { kind: EntityKind, id: Uuid },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The caller-facing category of a store failure.
///
/// Transport layers map these onto their own status codes; the store never
/// needs to know about HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  NotFound,
  Validation,
  Conflict,
  Internal,
}

impl ErrorClass {
  /// Stable machine-readable code for this class.
  pub fn code(self) -> &'static str {
    match self {
      Self::NotFound => "not_found",
      Self::Validation => "invalid_data",
      Self::Conflict => "has_dependents",
      Self::Internal => "server_error",
    }
  }
}

/// Implemented by every store error type so that higher layers can tell a
/// missing record from a storage fault without depending on the backend.
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::NotFound { .. } => ErrorClass::NotFound,
      Self::Validation(_) => ErrorClass::Validation,
      Self::HasDependents { .. } => ErrorClass::Conflict,
      Self::Serialization(_) => ErrorClass::Internal,
    }
  }
}
