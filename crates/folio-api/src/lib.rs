//! JSON REST API for Folio.
//!
//! Exposes an axum [`Router`] backed by any [`folio_core::store::RecordStore`].
//! Authentication, TLS, and transport concerns are the caller's
//! responsibility; handlers that write expect an
//! [`Actor`](folio_core::record::Actor) in the request extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", folio_api::api_router(store.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod extract;
pub mod records;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use folio_core::{
  content::{Category, ContactMessage, Media, Post, Redirect, SchemaBlock, Tag},
  entity::Entity,
  store::RecordStore,
};

pub use actor::ActingActor;
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    .merge(resource::<S, Post>())
    .merge(slugged::<S, Post>())
    .merge(resource::<S, Category>())
    .merge(slugged::<S, Category>())
    .merge(resource::<S, Tag>())
    .merge(slugged::<S, Tag>())
    .merge(resource::<S, Media>())
    .merge(resource::<S, ContactMessage>())
    .merge(resource::<S, Redirect>())
    .merge(resource::<S, SchemaBlock>())
    .with_state(store)
}

/// The routes for one entity kind, rooted at its collection path.
fn resource<S, T>() -> Router<Arc<S>>
where
  S: RecordStore + 'static,
  T: Entity,
{
  let collection = format!("/{}", T::KIND.collection());
  let item = format!("{collection}/{{id}}");

  Router::new()
    .route(
      &collection,
      get(records::list::<S, T>).post(records::create::<S, T>),
    )
    .route(
      &item,
      get(records::get_one::<S, T>)
        .put(records::update::<S, T>)
        .delete(records::delete::<S, T>),
    )
    .route(&format!("{item}/restore"), post(records::restore::<S, T>))
    .route(&format!("{item}/dependents"), get(records::dependents::<S, T>))
}

/// Permalink lookup for kinds that carry a slug.
fn slugged<S, T>() -> Router<Arc<S>>
where
  S: RecordStore + 'static,
  T: Entity,
{
  let path = format!("/{}/by-slug/{{slug}}", T::KIND.collection());
  Router::new().route(&path, get(records::get_by_slug::<S, T>))
}
