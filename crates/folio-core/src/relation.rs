//! The static table of relationships between entity kinds.
//!
//! The deletion guard walks this table instead of discovering relationships
//! at run time: a record of kind `K` may be blocked from deletion only by the
//! relations listed here with `target == K`.

use crate::entity::EntityKind;

/// A directed reference from one entity kind to another.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Relation {
  /// Stable name stored alongside every reference row.
  pub name:   &'static str,
  pub source: EntityKind,
  pub target: EntityKind,
}

pub const POST_CATEGORY: Relation = Relation {
  name:   "post.category",
  source: EntityKind::Post,
  target: EntityKind::Category,
};

pub const POST_TAGS: Relation = Relation {
  name:   "post.tags",
  source: EntityKind::Post,
  target: EntityKind::Tag,
};

pub const POST_COVER_MEDIA: Relation = Relation {
  name:   "post.cover_media",
  source: EntityKind::Post,
  target: EntityKind::Media,
};

pub const SCHEMA_BLOCK_POST: Relation = Relation {
  name:   "schema_block.post",
  source: EntityKind::SchemaBlock,
  target: EntityKind::Post,
};

pub static RELATIONS: &[Relation] =
  &[POST_CATEGORY, POST_TAGS, POST_COVER_MEDIA, SCHEMA_BLOCK_POST];

/// Relations whose referencing side could block deleting a `target` record.
pub fn referencing(
  target: EntityKind,
) -> impl Iterator<Item = &'static Relation> {
  RELATIONS.iter().filter(move |r| r.target == target)
}

/// Look up a relation by its stored name.
pub fn by_name(name: &str) -> Option<&'static Relation> {
  RELATIONS.iter().find(|r| r.name == name)
}
