//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `folio-store-sqlite`).
//! Higher layers (`folio-api`, `folio-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  entity::Entity,
  error::Classify,
  guard::Blocker,
  record::{Actor, Record, View},
  relation::Relation,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Sort order for [`RecordStore::list`]. The serialised names follow the
/// `ordering` query convention: a leading `-` means descending.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub enum SortOrder {
  #[default]
  #[serde(rename = "-created_at")]
  NewestFirst,
  #[serde(rename = "created_at")]
  OldestFirst,
  #[serde(rename = "-updated_at")]
  RecentlyUpdated,
  #[serde(rename = "updated_at")]
  LeastRecentlyUpdated,
}

/// The field of a referenced record that a [`RelatedFilter`] compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedField {
  Slug,
  Title,
}

/// Keeps records that reference, through `relation`, an alive target whose
/// `field` equals `value`.
#[derive(Debug, Clone)]
pub struct RelatedFilter {
  pub relation: &'static Relation,
  pub field:    RelatedField,
  pub value:    String,
}

/// Parameters for [`RecordStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  pub view:    View,
  /// Case-insensitive substring match against the entity's text values.
  pub text:    Option<String>,
  /// All filters must match.
  pub related: Vec<RelatedFilter>,
  pub order:   SortOrder,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

impl ListQuery {
  pub fn view(view: View) -> Self { Self { view, ..Default::default() } }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Folio record store backend.
///
/// Every method is scoped to one entity type `T`; an id that belongs to a
/// different kind is reported as not found. Writes take the acting principal
/// explicitly.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new record. The id and all audit fields are assigned here.
  fn create<T: Entity>(
    &self,
    fields: T,
    actor: Actor,
  ) -> impl Future<Output = Result<Record<T>, Self::Error>> + Send + '_;

  /// Replace the fields of an alive record. `created_by`/`created_at` are
  /// preserved. Soft-deleted records are not found.
  fn update<T: Entity>(
    &self,
    id: Uuid,
    fields: T,
    actor: Actor,
  ) -> impl Future<Output = Result<Record<T>, Self::Error>> + Send + '_;

  /// Flag a record as deleted. Fails with a conflict while live dependents
  /// exist. Deleting an already-deleted record returns it unchanged.
  fn soft_delete<T: Entity>(
    &self,
    id: Uuid,
    actor: Actor,
  ) -> impl Future<Output = Result<Record<T>, Self::Error>> + Send + '_;

  /// Clear the deleted flag. Restoring an alive record returns it unchanged.
  fn restore<T: Entity>(
    &self,
    id: Uuid,
    actor: Actor,
  ) -> impl Future<Output = Result<Record<T>, Self::Error>> + Send + '_;

  /// Irreversibly remove a record, bypassing the dependency guard.
  ///
  /// Reserved for administrative erasure. Records referencing the removed one
  /// are left untouched.
  fn hard_delete<T: Entity>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Dependency guard ──────────────────────────────────────────────────

  /// Relations with at least one alive record referencing `id`.
  fn dependents<T: Entity>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Blocker>, Self::Error>> + Send + '_;

  /// `true` when nothing alive references `id`.
  fn can_delete<T: Entity>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_ {
    async move { Ok(self.dependents::<T>(id).await?.is_empty()) }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Fetch one record if it is visible in `view`.
  fn get<T: Entity>(
    &self,
    id: Uuid,
    view: View,
  ) -> impl Future<Output = Result<Option<Record<T>>, Self::Error>> + Send + '_;

  /// Fetch one record by its slug if it is visible in `view`. Kinds without
  /// slugs never match.
  fn get_by_slug<T: Entity>(
    &self,
    slug: String,
    view: View,
  ) -> impl Future<Output = Result<Option<Record<T>>, Self::Error>> + Send + '_;

  fn list<T: Entity>(
    &self,
    query: ListQuery,
  ) -> impl Future<Output = Result<Vec<Record<T>>, Self::Error>> + Send + '_;

  fn list_alive<T: Entity>(
    &self,
  ) -> impl Future<Output = Result<Vec<Record<T>>, Self::Error>> + Send + '_ {
    self.list::<T>(ListQuery::view(View::Alive))
  }

  fn list_deleted<T: Entity>(
    &self,
  ) -> impl Future<Output = Result<Vec<Record<T>>, Self::Error>> + Send + '_ {
    self.list::<T>(ListQuery::view(View::Deleted))
  }

  fn list_all<T: Entity>(
    &self,
  ) -> impl Future<Output = Result<Vec<Record<T>>, Self::Error>> + Send + '_ {
    self.list::<T>(ListQuery::view(View::All))
  }
}
