//! HTTP server wiring for Folio.
//!
//! Mounts the record API under `/api` behind Basic auth, adds an
//! unauthenticated `/health` check, and exposes the administrative
//! [`purge`] used by the CLI.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, middleware, routing::get};
use folio_core::{
  content::{Category, ContactMessage, Media, Post, Redirect, SchemaBlock, Tag},
  entity::EntityKind,
  guard::GuardPolicy,
  store::RecordStore,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:         String,
  pub port:         u16,
  pub store_path:   PathBuf,
  #[serde(default)]
  pub guard_policy: GuardPolicy,
  #[serde(default)]
  pub users:        Vec<UserConfig>,
}

/// A user allowed to sign in; `id` becomes the audit [`Actor`](folio_core::record::Actor).
#[derive(Deserialize, Clone)]
pub struct UserConfig {
  pub id:            Uuid,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

// ─── Application state ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState<S: RecordStore> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S: RecordStore> AppState<S> {
  pub fn new(store: S, config: &ServerConfig) -> Self {
    Self {
      store: Arc::new(store),
      auth:  Arc::new(AuthConfig { users: config.users.clone() }),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RecordStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", folio_api::api_router(state.store.clone()))
    .layer(middleware::from_fn_with_state(
      state.auth.clone(),
      auth::authenticate,
    ))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

// ─── Administration ───────────────────────────────────────────────────────────

/// Irreversibly remove one record of `kind`. Bypasses the deletion guard.
pub async fn purge<S: RecordStore>(
  store: &S,
  kind: EntityKind,
  id: Uuid,
) -> Result<(), S::Error> {
  match kind {
    EntityKind::Post => store.hard_delete::<Post>(id).await,
    EntityKind::Category => store.hard_delete::<Category>(id).await,
    EntityKind::Tag => store.hard_delete::<Tag>(id).await,
    EntityKind::Media => store.hard_delete::<Media>(id).await,
    EntityKind::ContactMessage => store.hard_delete::<ContactMessage>(id).await,
    EntityKind::Redirect => store.hard_delete::<Redirect>(id).await,
    EntityKind::SchemaBlock => store.hard_delete::<SchemaBlock>(id).await,
  }?;
  tracing::info!(%kind, %id, "purged record");
  Ok(())
}
