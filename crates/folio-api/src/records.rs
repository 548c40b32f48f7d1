//! Generic handlers mounted once per entity kind.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{kind}` | `?view=alive\|deleted\|all`, `?q`, `?ordering`, `?limit`, `?offset`, related filters |
//! | `POST`   | `/{kind}` | Body: entity fields; returns 201 + record |
//! | `GET`    | `/{kind}/{id}` | `?view`, default `alive`; 404 if not visible |
//! | `GET`    | `/{kind}/by-slug/{slug}` | Slugged kinds only; `?view` as above |
//! | `PUT`    | `/{kind}/{id}` | Body: entity fields; alive records only |
//! | `DELETE` | `/{kind}/{id}` | Soft delete; 409 while live dependents exist |
//! | `POST`   | `/{kind}/{id}/restore` | Undo a soft delete |
//! | `GET`    | `/{kind}/{id}/dependents` | `{"can_delete": bool, "blockers": [...]}` |
//!
//! Malformed bodies, ids and query strings are reported as `400 invalid_data`.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use folio_core::{
  entity::{Entity, EntityKind},
  guard::Blocker,
  record::{Record, View},
  relation::RELATIONS,
  store::{ListQuery, RecordStore, RelatedField, RelatedFilter, SortOrder},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  actor::ActingActor,
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
};

/// Page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 100;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub view:     View,
  /// Free-text filter over the entity's text values.
  pub q:        Option<String>,
  /// `created_at`, `-created_at` (default), `updated_at` or `-updated_at`.
  #[serde(default)]
  pub ordering: SortOrder,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
  /// Records referencing the category with this slug.
  #[serde(rename = "category__slug")]
  pub category: Option<String>,
  /// Records referencing a tag with this title.
  #[serde(rename = "tags__title")]
  pub tag:      Option<String>,
}

/// A filter on the `kind` records that `T` references. Kinds that reference
/// nothing of that kind cannot be filtered by it.
fn related_filter<T: Entity>(
  param: &str,
  target: EntityKind,
  field: RelatedField,
  value: String,
) -> Result<RelatedFilter, ApiError> {
  let relation = RELATIONS
    .iter()
    .find(|r| r.source == T::KIND && r.target == target)
    .ok_or_else(|| {
      ApiError::Invalid(format!("{param}: {} cannot be filtered by {target}", T::KIND))
    })?;
  Ok(RelatedFilter { relation, field, value })
}

/// `GET /{kind}[?view=...][&q=...][&ordering=...][&limit=...][&offset=...]`
pub async fn list<S, T>(
  State(store): State<Arc<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<Record<T>>>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let mut related = Vec::new();
  if let Some(slug) = params.category {
    related.push(related_filter::<T>(
      "category__slug",
      EntityKind::Category,
      RelatedField::Slug,
      slug,
    )?);
  }
  if let Some(title) = params.tag {
    related.push(related_filter::<T>(
      "tags__title",
      EntityKind::Tag,
      RelatedField::Title,
      title,
    )?);
  }

  let query = ListQuery {
    view: params.view,
    text: params.q.filter(|q| !q.trim().is_empty()),
    related,
    order: params.ordering,
    limit: Some(params.limit.unwrap_or(DEFAULT_LIMIT)),
    offset: params.offset,
  };
  let records = store.list::<T>(query).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetParams {
  #[serde(default)]
  pub view: View,
}

/// `GET /{kind}/{id}[?view=...]`
pub async fn get_one<S, T>(
  State(store): State<Arc<S>>,
  PathParam(id): PathParam<Uuid>,
  QueryParams(params): QueryParams<GetParams>,
) -> Result<Json<Record<T>>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let record = store
    .get::<T>(id, params.view)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("{} {id} not found", T::KIND)))?;
  Ok(Json(record))
}

/// `GET /{kind}/by-slug/{slug}[?view=...]`
pub async fn get_by_slug<S, T>(
  State(store): State<Arc<S>>,
  PathParam(slug): PathParam<String>,
  QueryParams(params): QueryParams<GetParams>,
) -> Result<Json<Record<T>>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let missing = ApiError::NotFound(format!("no {} with slug {slug:?}", T::KIND));
  let record = store
    .get_by_slug::<T>(slug, params.view)
    .await
    .map_err(ApiError::store)?
    .ok_or(missing)?;
  Ok(Json(record))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// `POST /{kind}`: returns 201 and the stored record.
pub async fn create<S, T>(
  State(store): State<Arc<S>>,
  ActingActor(actor): ActingActor,
  JsonBody(body): JsonBody<T>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let record = store.create(body, actor).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /{kind}/{id}`. A blank slug keeps the stored one.
pub async fn update<S, T>(
  State(store): State<Arc<S>>,
  PathParam(id): PathParam<Uuid>,
  ActingActor(actor): ActingActor,
  JsonBody(body): JsonBody<T>,
) -> Result<Json<Record<T>>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let record = store.update(id, body, actor).await.map_err(ApiError::store)?;
  Ok(Json(record))
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

/// `DELETE /{kind}/{id}`: soft delete; the row is kept.
pub async fn delete<S, T>(
  State(store): State<Arc<S>>,
  PathParam(id): PathParam<Uuid>,
  ActingActor(actor): ActingActor,
) -> Result<Json<Record<T>>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let record = store
    .soft_delete::<T>(id, actor)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(record))
}

/// `POST /{kind}/{id}/restore`
pub async fn restore<S, T>(
  State(store): State<Arc<S>>,
  PathParam(id): PathParam<Uuid>,
  ActingActor(actor): ActingActor,
) -> Result<Json<Record<T>>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let record = store.restore::<T>(id, actor).await.map_err(ApiError::store)?;
  Ok(Json(record))
}

#[derive(Debug, Serialize)]
pub struct DependentsBody {
  pub can_delete: bool,
  pub blockers:   Vec<Blocker>,
}

/// `GET /{kind}/{id}/dependents`
pub async fn dependents<S, T>(
  State(store): State<Arc<S>>,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<DependentsBody>, ApiError>
where
  S: RecordStore,
  T: Entity,
{
  let blockers = store.dependents::<T>(id).await.map_err(ApiError::store)?;
  Ok(Json(DependentsBody { can_delete: blockers.is_empty(), blockers }))
}
