//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use folio_core::{
  entity::{Entity, EntityKind, SlugRequest, slug_candidates, slug_request},
  guard::{Blocker, GuardPolicy, collect_blockers},
  record::{Actor, Record, RecordMeta, View},
  relation::{self, Relation},
  store::{ListQuery, RecordStore, RelatedField, SortOrder},
};

use crate::{
  Error, Result,
  encode::{RECORD_COLUMNS, RawRecord, encode_dt, encode_uuid, now},
  schema::SCHEMA,
};

fn not_found(kind: EntityKind, id: Uuid) -> Error {
  folio_core::Error::NotFound { kind, id }.into()
}

fn invalid(message: String) -> Error { folio_core::Error::Validation(message).into() }

// ─── Prepared writes ─────────────────────────────────────────────────────────

/// Everything derived from an entity value before it is written.
struct Prepared {
  fields_json: String,
  slug:        Option<String>,
  /// `(relation name, target id)` pairs, already encoded.
  refs:        Vec<(&'static str, String)>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folio record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:         tokio_rusqlite::Connection,
  guard_policy: GuardPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, guard_policy: GuardPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, guard_policy: GuardPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Choose how failed dependency checks are treated.
  pub fn with_guard_policy(mut self, policy: GuardPolicy) -> Self {
    self.guard_policy = policy;
    self
  }

  pub fn guard_policy(&self) -> GuardPolicy { self.guard_policy }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load the raw row for `id` regardless of its deleted flag.
  async fn fetch_raw(&self, kind: EntityKind, id: Uuid) -> Result<Option<RawRecord>> {
    let id_str = encode_uuid(id);
    let kind_str = kind.as_str();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1 AND kind = ?2"),
              rusqlite::params![id_str, kind_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }

  /// Load a record in any partition, or fail with `NotFound`.
  async fn fetch_any<T: Entity>(&self, id: Uuid) -> Result<Record<T>> {
    self
      .fetch_raw(T::KIND, id)
      .await?
      .ok_or_else(|| not_found(T::KIND, id))?
      .into_record()
  }

  /// Every referenced id must name an alive record of the relation's target
  /// kind.
  async fn check_references(&self, refs: &[(&'static Relation, Uuid)]) -> Result<()> {
    if refs.is_empty() {
      return Ok(());
    }
    let ids: Vec<String> = refs.iter().map(|(_, id)| encode_uuid(*id)).collect();

    let found: Vec<Option<(String, bool)>> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT kind, is_deleted FROM records WHERE id = ?1")?;
        let mut out = Vec::with_capacity(ids.len());
        for id in &ids {
          out.push(
            stmt
              .query_row(rusqlite::params![id], |row| Ok((row.get(0)?, row.get(1)?)))
              .optional()?,
          );
        }
        Ok(out)
      })
      .await?;

    for ((relation, id), row) in refs.iter().zip(found) {
      match row {
        Some((kind, false)) if kind == relation.target.as_str() => {}
        Some((kind, true)) if kind == relation.target.as_str() => {
          return Err(invalid(format!(
            "{}: {} {id} is deleted",
            relation.name, relation.target
          )));
        }
        _ => {
          return Err(invalid(format!(
            "{}: no {} with id {id}",
            relation.name, relation.target
          )));
        }
      }
    }
    Ok(())
  }

  async fn slug_taken(&self, kind: EntityKind, slug: &str, own_id: Uuid) -> Result<bool> {
    let kind_str = kind.as_str();
    let slug = slug.to_owned();
    let own_id = encode_uuid(own_id);

    let taken = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM records WHERE kind = ?1 AND slug = ?2 AND id != ?3",
              rusqlite::params![kind_str, slug, own_id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(taken)
  }

  /// Settle the slug of `fields`, writing the final value back into it.
  ///
  /// Slugs are unique per kind across every partition, so restoring a
  /// soft-deleted record can never collide.
  async fn settle_slug<T: Entity>(&self, fields: &mut T, own_id: Uuid) -> Result<Option<String>> {
    let slug = match slug_request(fields)? {
      SlugRequest::None => None,
      SlugRequest::Explicit(slug) => {
        if self.slug_taken(T::KIND, &slug, own_id).await? {
          return Err(invalid(format!("slug: {slug:?} already exists")));
        }
        Some(slug)
      }
      SlugRequest::Derived(base) if T::SLUG_COUNTER => {
        let mut chosen = None;
        for candidate in slug_candidates(&base) {
          if !self.slug_taken(T::KIND, &candidate, own_id).await? {
            chosen = Some(candidate);
            break;
          }
        }
        chosen
      }
      SlugRequest::Derived(base) => {
        if self.slug_taken(T::KIND, &base, own_id).await? {
          return Err(invalid(format!("slug: {base:?} already exists")));
        }
        Some(base)
      }
    };

    if let Some(slot) = fields.slug_mut() {
      *slot = slug.clone();
    }
    Ok(slug)
  }

  /// Validate `fields`, settle its slug and check its references.
  async fn prepare<T: Entity>(&self, fields: &mut T, own_id: Uuid) -> Result<Prepared> {
    fields.validate()?;
    let slug = self.settle_slug(fields, own_id).await?;

    let refs: Vec<_> = fields
      .references()
      .into_iter()
      .map(|r| (r.relation, r.target))
      .collect();
    self.check_references(&refs).await?;

    Ok(Prepared {
      fields_json: serde_json::to_string(fields)?,
      slug,
      refs: refs
        .into_iter()
        .map(|(relation, target)| (relation.name, encode_uuid(target)))
        .collect(),
    })
  }

  async fn insert(&self, kind: EntityKind, meta: &RecordMeta, prepared: Prepared) -> Result<()> {
    let id_str = encode_uuid(meta.id);
    let kind_str = kind.as_str();
    let created_by = encode_uuid(meta.created_by.0);
    let updated_by = encode_uuid(meta.updated_by.0);
    let created_at = encode_dt(meta.created_at);
    let updated_at = encode_dt(meta.updated_at);
    let Prepared { fields_json, slug, refs } = prepared;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO records (
             id, kind, fields_json, slug, created_by, updated_by,
             created_at, updated_at, is_deleted, deleted_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL)",
          rusqlite::params![
            id_str, kind_str, fields_json, slug, created_by, updated_by, created_at,
            updated_at,
          ],
        )?;
        insert_refs(&tx, &id_str, &refs)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Overwrite the fields of an alive record. Returns `false` if no alive row
  /// matched.
  async fn rewrite(&self, kind: EntityKind, meta: &RecordMeta, prepared: Prepared) -> Result<bool> {
    let id_str = encode_uuid(meta.id);
    let kind_str = kind.as_str();
    let updated_by = encode_uuid(meta.updated_by.0);
    let updated_at = encode_dt(meta.updated_at);
    let Prepared { fields_json, slug, refs } = prepared;

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE records
           SET fields_json = ?1, slug = ?2, updated_by = ?3, updated_at = ?4
           WHERE id = ?5 AND kind = ?6 AND is_deleted = 0",
          rusqlite::params![fields_json, slug, updated_by, updated_at, id_str, kind_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.execute(
          "DELETE FROM record_refs WHERE source_id = ?1",
          rusqlite::params![id_str],
        )?;
        insert_refs(&tx, &id_str, &refs)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(updated)
  }

  /// Persist the delete flag and audit columns of `meta`.
  async fn write_state(&self, kind: EntityKind, meta: &RecordMeta) -> Result<bool> {
    let id_str = encode_uuid(meta.id);
    let kind_str = kind.as_str();
    let updated_by = encode_uuid(meta.updated_by.0);
    let updated_at = encode_dt(meta.updated_at);
    let deleted_at = meta.deleted_at.map(encode_dt);
    let is_deleted = meta.is_deleted;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE records
           SET is_deleted = ?1, deleted_at = ?2, updated_by = ?3, updated_at = ?4
           WHERE id = ?5 AND kind = ?6",
          rusqlite::params![is_deleted, deleted_at, updated_by, updated_at, id_str, kind_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  /// Alive records of `relation.source` that reference `target`.
  async fn count_live_refs(&self, relation: &'static Relation, target: Uuid) -> Result<u64> {
    let target_str = encode_uuid(target);
    let source_kind = relation.source.as_str();
    let name = relation.name;

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*)
           FROM record_refs r
           JOIN records s ON s.id = r.source_id
           WHERE r.target_id = ?1
             AND r.relation  = ?2
             AND s.kind      = ?3
             AND s.is_deleted = 0",
          rusqlite::params![target_str, name, source_kind],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as u64)
  }
}

fn insert_refs(
  tx: &rusqlite::Transaction<'_>,
  source_id: &str,
  refs: &[(&'static str, String)],
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "INSERT OR IGNORE INTO record_refs (source_id, relation, target_id) VALUES (?1, ?2, ?3)",
  )?;
  for (relation, target) in refs {
    stmt.execute(rusqlite::params![source_id, relation, target])?;
  }
  Ok(())
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create<T: Entity>(&self, mut fields: T, actor: Actor) -> Result<Record<T>> {
    let meta = RecordMeta::new(actor, now());
    let prepared = self.prepare(&mut fields, meta.id).await?;
    self.insert(T::KIND, &meta, prepared).await?;

    tracing::debug!(kind = %T::KIND, id = %meta.id, %actor, "record created");
    Ok(Record { meta, fields })
  }

  async fn update<T: Entity>(&self, id: Uuid, mut fields: T, actor: Actor) -> Result<Record<T>> {
    let raw = self
      .fetch_raw(T::KIND, id)
      .await?
      .filter(|raw| !raw.is_deleted)
      .ok_or_else(|| not_found(T::KIND, id))?;
    let mut meta = raw.decode_meta()?;
    meta.touch(actor, now());
    carry_slug(&mut fields, serde_json::from_str::<T>(&raw.fields_json)?);

    let prepared = self.prepare(&mut fields, id).await?;
    if !self.rewrite(T::KIND, &meta, prepared).await? {
      return Err(not_found(T::KIND, id));
    }

    tracing::debug!(kind = %T::KIND, %id, %actor, "record updated");
    Ok(Record { meta, fields })
  }

  async fn soft_delete<T: Entity>(&self, id: Uuid, actor: Actor) -> Result<Record<T>> {
    let mut record = self.fetch_any::<T>(id).await?;
    if record.meta.is_deleted {
      return Ok(record);
    }

    let blockers = self.dependents::<T>(id).await?;
    if !blockers.is_empty() {
      tracing::debug!(kind = %T::KIND, %id, ?blockers, "soft delete blocked");
      return Err(folio_core::Error::HasDependents { kind: T::KIND, id }.into());
    }

    record.meta.mark_deleted(actor, now());
    if !self.write_state(T::KIND, &record.meta).await? {
      return Err(not_found(T::KIND, id));
    }

    tracing::debug!(kind = %T::KIND, %id, %actor, "record soft-deleted");
    Ok(record)
  }

  async fn restore<T: Entity>(&self, id: Uuid, actor: Actor) -> Result<Record<T>> {
    let mut record = self.fetch_any::<T>(id).await?;
    if !record.meta.mark_restored(actor, now()) {
      return Ok(record);
    }
    if !self.write_state(T::KIND, &record.meta).await? {
      return Err(not_found(T::KIND, id));
    }

    tracing::debug!(kind = %T::KIND, %id, %actor, "record restored");
    Ok(record)
  }

  async fn hard_delete<T: Entity>(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let kind_str = T::KIND.as_str();

    let (deleted, dangling): (usize, i64) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let dangling: i64 = tx.query_row(
          "SELECT COUNT(*)
           FROM record_refs r
           JOIN records s ON s.id = r.source_id
           WHERE r.target_id = ?1 AND s.is_deleted = 0",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?;
        let deleted = tx.execute(
          "DELETE FROM records WHERE id = ?1 AND kind = ?2",
          rusqlite::params![id_str, kind_str],
        )?;
        tx.commit()?;
        Ok((deleted, dangling))
      })
      .await?;

    if deleted == 0 {
      return Err(not_found(T::KIND, id));
    }
    if dangling > 0 {
      tracing::warn!(
        kind = %T::KIND,
        %id,
        dangling,
        "hard delete left live records referencing a removed record"
      );
    } else {
      tracing::debug!(kind = %T::KIND, %id, "record hard-deleted");
    }
    Ok(())
  }

  // ── Dependency guard ──────────────────────────────────────────────────────

  async fn dependents<T: Entity>(&self, id: Uuid) -> Result<Vec<Blocker>> {
    if self.fetch_raw(T::KIND, id).await?.is_none() {
      return Err(not_found(T::KIND, id));
    }

    let mut outcomes = Vec::new();
    for relation in relation::referencing(T::KIND) {
      outcomes.push((relation, self.count_live_refs(relation, id).await));
    }
    collect_blockers(T::KIND, id, outcomes, self.guard_policy)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get<T: Entity>(&self, id: Uuid, view: View) -> Result<Option<Record<T>>> {
    let Some(raw) = self.fetch_raw(T::KIND, id).await? else {
      return Ok(None);
    };
    let record = raw.into_record::<T>()?;
    Ok(view.contains(&record.meta).then_some(record))
  }

  async fn get_by_slug<T: Entity>(&self, slug: String, view: View) -> Result<Option<Record<T>>> {
    let kind_str = T::KIND.as_str();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RECORD_COLUMNS} FROM records WHERE kind = ?1 AND slug = ?2"),
              rusqlite::params![kind_str, slug],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    let Some(raw) = raw else {
      return Ok(None);
    };
    let record = raw.into_record::<T>()?;
    Ok(view.contains(&record.meta).then_some(record))
  }

  async fn list<T: Entity>(&self, query: ListQuery) -> Result<Vec<Record<T>>> {
    let mut clauses = vec!["kind = ?".to_owned()];
    let mut args = vec![Value::Text(T::KIND.as_str().to_owned())];

    match query.view {
      View::Alive => clauses.push("is_deleted = 0".to_owned()),
      View::Deleted => clauses.push("is_deleted = 1".to_owned()),
      View::All => {}
    }

    // Only string values are searched; object keys never match.
    if let Some(text) = query.text.as_deref() {
      clauses.push(
        "EXISTS (SELECT 1 FROM json_tree(records.fields_json) j
                 WHERE j.type = 'text' AND j.value LIKE ? ESCAPE '\\')"
          .to_owned(),
      );
      args.push(Value::Text(format!("%{}%", escape_like(text))));
    }

    for filter in &query.related {
      let column = match filter.field {
        RelatedField::Slug => "t.slug",
        RelatedField::Title => "json_extract(t.fields_json, '$.title')",
      };
      clauses.push(format!(
        "EXISTS (SELECT 1
                 FROM record_refs r
                 JOIN records t ON t.id = r.target_id
                 WHERE r.source_id = records.id
                   AND r.relation = ?
                   AND t.kind = ?
                   AND t.is_deleted = 0
                   AND {column} = ?)"
      ));
      args.push(Value::Text(filter.relation.name.to_owned()));
      args.push(Value::Text(filter.relation.target.as_str().to_owned()));
      args.push(Value::Text(filter.value.clone()));
    }

    let order = match query.order {
      SortOrder::NewestFirst => "created_at DESC, rowid DESC",
      SortOrder::OldestFirst => "created_at ASC, rowid ASC",
      SortOrder::RecentlyUpdated => "updated_at DESC, rowid DESC",
      SortOrder::LeastRecentlyUpdated => "updated_at ASC, rowid ASC",
    };

    // SQLite treats a negative LIMIT as "no limit".
    args.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));
    args.push(Value::Integer(query.offset.unwrap_or(0) as i64));

    let sql = format!(
      "SELECT {RECORD_COLUMNS}
       FROM records
       WHERE {}
       ORDER BY {order}
       LIMIT ? OFFSET ?",
      clauses.join(" AND ")
    );

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

/// Escape `LIKE` wildcards so `text` matches literally.
fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

/// An update that leaves the slug blank keeps the stored one, so renaming a
/// record does not move its permalink.
fn carry_slug<T: Entity>(fields: &mut T, mut stored: T) {
  let previous = stored.slug_mut().and_then(Option::take);
  if let Some(slot) = fields.slug_mut()
    && slot.as_deref().is_none_or(|s| s.trim().is_empty())
  {
    *slot = previous;
  }
}

