//! The deletion guard: decides whether live dependents block a soft delete.
//!
//! Backends count live referencing rows per relation and hand the per-relation
//! outcomes to [`collect_blockers`], which applies the configured
//! [`GuardPolicy`] to any relation whose count could not be evaluated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entity::EntityKind, relation::Relation};

/// How a failed per-relation check is treated.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GuardPolicy {
  /// Log the failure and treat the relation as non-blocking.
  #[default]
  Lenient,
  /// Propagate the failure to the caller.
  Strict,
}

/// A relation that currently blocks deleting a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
  pub relation:   &'static str,
  pub source:     EntityKind,
  /// Number of alive records referencing the target through `relation`.
  pub live_count: u64,
}

/// Fold per-relation live counts into the list of blockers.
///
/// Under [`GuardPolicy::Strict`] the first failed relation aborts the check.
pub fn collect_blockers<E>(
  kind: EntityKind,
  id: Uuid,
  outcomes: impl IntoIterator<Item = (&'static Relation, Result<u64, E>)>,
  policy: GuardPolicy,
) -> Result<Vec<Blocker>, E>
where
  E: std::fmt::Display,
{
  let mut blockers = Vec::new();
  for (relation, outcome) in outcomes {
    match outcome {
      Ok(0) => {}
      Ok(live_count) => blockers.push(Blocker {
        relation: relation.name,
        source: relation.source,
        live_count,
      }),
      Err(err) => match policy {
        GuardPolicy::Lenient => {
          tracing::warn!(
            %kind,
            %id,
            relation = relation.name,
            error = %err,
            "dependency check failed; treating relation as non-blocking"
          );
        }
        GuardPolicy::Strict => return Err(err),
      },
    }
  }
  Ok(blockers)
}
