//! HTTP Basic-auth verification and the middleware that resolves the acting
//! user for every API request.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use folio_core::{entity::EntityKind, record::Actor};

use crate::{UserConfig, error::Error};

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub users: Vec<UserConfig>,
}

/// Verify Basic credentials and return the matching user's [`Actor`].
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Actor, Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let user = config
    .users
    .iter()
    .find(|u| u.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&user.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Actor(user.id))
}

/// Requests that may proceed without credentials, and the actor they get.
fn public_actor(method: &Method, path: &str) -> Option<Option<Actor>> {
  if path == "/health" {
    return Some(None);
  }
  let contact = format!("/api/{}", EntityKind::ContactMessage.collection());
  if method == Method::POST && path == contact {
    return Some(Some(Actor::ANONYMOUS));
  }
  None
}

/// Resolve the caller and insert its [`Actor`] into the request extensions.
///
/// Credentials, when sent, are always checked, even on public routes.
pub async fn authenticate(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let has_credentials = req.headers().contains_key(header::AUTHORIZATION);
  let public = public_actor(req.method(), req.uri().path());

  let actor = match public {
    Some(fallback) if !has_credentials => fallback,
    _ => Some(verify_auth(req.headers(), &auth)?),
  };

  if let Some(actor) = actor {
    req.extensions_mut().insert(actor);
  }
  Ok(next.run(req).await)
}
