//! The [`Entity`] trait and the closed set of entity kinds.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result, relation::Relation};

/// Every entity type the store knows about. The `snake_case` name is the
/// discriminant stored in the `kind` column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Post,
  Category,
  Tag,
  Media,
  ContactMessage,
  Redirect,
  SchemaBlock,
}

impl EntityKind {
  /// The discriminant string stored in the database.
  pub fn as_str(self) -> &'static str { self.into() }

  /// The URL path segment for this kind's collection.
  pub fn collection(self) -> &'static str {
    match self {
      Self::Post => "posts",
      Self::Category => "categories",
      Self::Tag => "tags",
      Self::Media => "media",
      Self::ContactMessage => "contact-messages",
      Self::Redirect => "redirects",
      Self::SchemaBlock => "schema-blocks",
    }
  }
}

/// One outgoing reference held by an entity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
  pub relation: &'static Relation,
  pub target:   Uuid,
}

impl Reference {
  pub fn new(relation: &'static Relation, target: Uuid) -> Self {
    Self { relation, target }
  }
}

/// The entity-specific part of a record.
///
/// Implementors only describe their own fields; identity, audit and
/// soft-delete handling come from [`crate::record::Record`].
pub trait Entity:
  Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
  const KIND: EntityKind;

  /// Outgoing references, one entry per referenced id. Every entry's
  /// relation must have `source == Self::KIND`.
  fn references(&self) -> Vec<Reference> { Vec::new() }

  /// Check entity-local constraints (lengths, required fields, formats).
  fn validate(&self) -> Result<()> { Ok(()) }

  /// The text a missing slug is derived from. Entities without a slug
  /// return `None`.
  fn slug_source(&self) -> Option<&str> { None }

  /// The slug slot, for entities that carry one.
  fn slug_mut(&mut self) -> Option<&mut Option<String>> { None }

  /// Whether a derived slug that collides gets a `-2`, `-3`, ... suffix
  /// instead of being rejected.
  const SLUG_COUNTER: bool = false;
}

// ─── Slugs ───────────────────────────────────────────────────────────────────

/// How the store must settle an entity's slug before writing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugRequest {
  /// The entity has no slug, or nothing to derive one from.
  None,
  /// The caller supplied a slug; it must be unique as given.
  Explicit(String),
  /// Derived from the entity's title; collisions are resolved per
  /// [`Entity::SLUG_COUNTER`].
  Derived(String),
}

/// Work out which slug `value` should carry.
pub fn slug_request<T: Entity>(value: &mut T) -> Result<SlugRequest> {
  let derived = value.slug_source().map(slug::slugify);
  let Some(slot) = value.slug_mut() else {
    return Ok(SlugRequest::None);
  };

  if let Some(explicit) = slot.as_deref().map(str::trim)
    && !explicit.is_empty()
  {
    if !is_slug(explicit) {
      return Err(Error::validation(
        "slug: use only letters, numbers, underscores or hyphens",
      ));
    }
    return Ok(SlugRequest::Explicit(explicit.to_owned()));
  }

  Ok(match derived {
    Some(base) if !base.is_empty() => SlugRequest::Derived(base),
    _ => SlugRequest::None,
  })
}

/// Letters, digits, `_` and `-` only.
pub fn is_slug(value: &str) -> bool {
  !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// `base`, `base-2`, `base-3`, ...
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
  std::iter::once(base.to_owned())
    .chain((2u32..).map(move |n| format!("{base}-{n}")))
}
