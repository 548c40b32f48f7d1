//! The record envelope shared by every entity.
//!
//! A [`Record`] pairs the entity-specific fields with a [`RecordMeta`] that
//! carries identity, audit attribution and the soft-delete flag. Every entity
//! goes through the same envelope, so identity, audit and delete semantics
//! cannot drift between entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The principal a mutation is attributed to.
///
/// Resolved by the authentication layer and passed explicitly to every store
/// call that writes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Actor(pub Uuid);

impl Actor {
  /// Attribution for unauthenticated public submissions.
  pub const ANONYMOUS: Actor = Actor(Uuid::nil());

  pub fn is_anonymous(&self) -> bool { self.0.is_nil() }
}

impl std::fmt::Display for Actor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

// ─── Visibility ──────────────────────────────────────────────────────────────

/// Lifecycle state of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
  Alive,
  SoftDeleted,
}

/// The read partitions a caller can ask for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum View {
  /// `is_deleted = false`.
  #[default]
  Alive,
  /// `is_deleted = true`.
  Deleted,
  /// Both of the above.
  All,
}

impl View {
  pub fn contains(self, meta: &RecordMeta) -> bool {
    match self {
      Self::Alive => !meta.is_deleted,
      Self::Deleted => meta.is_deleted,
      Self::All => true,
    }
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Identity and audit fields embedded in every record.
///
/// `deleted_at` is `Some` exactly when `is_deleted` is set; the transition
/// methods below are the only writers of either field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
  pub id:         Uuid,
  pub created_by: Actor,
  pub updated_by: Actor,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub is_deleted: bool,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
  /// Fresh metadata for a record that has not been persisted yet.
  pub fn new(actor: Actor, now: DateTime<Utc>) -> Self {
    Self {
      id:         Uuid::new_v4(),
      created_by: actor,
      updated_by: actor,
      created_at: now,
      updated_at: now,
      is_deleted: false,
      deleted_at: None,
    }
  }

  pub fn state(&self) -> RecordState {
    if self.is_deleted {
      RecordState::SoftDeleted
    } else {
      RecordState::Alive
    }
  }

  /// Attribute a mutation to `actor`.
  pub fn touch(&mut self, actor: Actor, now: DateTime<Utc>) {
    self.updated_by = actor;
    self.updated_at = now;
  }

  /// Move to [`RecordState::SoftDeleted`]. Returns `false` (and changes
  /// nothing) if the record was already deleted.
  pub fn mark_deleted(&mut self, actor: Actor, now: DateTime<Utc>) -> bool {
    if self.is_deleted {
      return false;
    }
    self.is_deleted = true;
    self.deleted_at = Some(now);
    self.touch(actor, now);
    true
  }

  /// Move back to [`RecordState::Alive`]. Returns `false` (and changes
  /// nothing) if the record was already alive.
  pub fn mark_restored(&mut self, actor: Actor, now: DateTime<Utc>) -> bool {
    if !self.is_deleted {
      return false;
    }
    self.is_deleted = false;
    self.deleted_at = None;
    self.touch(actor, now);
    true
  }

  /// `true` when the delete flag and timestamp agree.
  pub fn is_consistent(&self) -> bool {
    self.is_deleted == self.deleted_at.is_some()
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// An entity together with its metadata. Serialises flat, so API consumers see
/// `id`, the audit fields and the entity fields side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<T> {
  #[serde(flatten)]
  pub meta:   RecordMeta,
  #[serde(flatten)]
  pub fields: T,
}

impl<T> Record<T> {
  pub fn id(&self) -> Uuid { self.meta.id }

  pub fn state(&self) -> RecordState { self.meta.state() }
}
