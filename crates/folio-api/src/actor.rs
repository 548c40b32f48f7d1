//! Extractor for the principal a request acts on behalf of.

use axum::{extract::FromRequestParts, http::request::Parts};
use folio_core::record::Actor;

use crate::error::ApiError;

/// The authenticated [`Actor`] for this request.
///
/// The API does not authenticate anyone itself: an outer layer resolves the
/// caller and inserts an [`Actor`] into the request extensions. Requests that
/// reach a handler without one are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct ActingActor(pub Actor);

impl<S> FromRequestParts<S> for ActingActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Actor>()
      .copied()
      .map(ActingActor)
      .ok_or(ApiError::Unauthenticated)
  }
}
