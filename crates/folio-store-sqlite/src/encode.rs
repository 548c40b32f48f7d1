//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order matches chronological order.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use folio_core::{
  entity::Entity,
  record::{Actor, Record, RecordMeta},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current time, truncated to what [`encode_dt`] preserves, so that the
/// value handed back to callers equals the value read back later.
pub fn now() -> DateTime<Utc> {
  let now = Utc::now();
  let micros = now.timestamp_micros();
  DateTime::from_timestamp_micros(micros).unwrap_or(now)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "id, kind, fields_json, created_by, updated_by, \
                                  created_at, updated_at, is_deleted, deleted_at";

/// Raw strings read directly from a `records` row.
#[derive(Debug, Clone)]
pub struct RawRecord {
  pub id:          String,
  pub kind:        String,
  pub fields_json: String,
  pub created_by:  String,
  pub updated_by:  String,
  pub created_at:  String,
  pub updated_at:  String,
  pub is_deleted:  bool,
  pub deleted_at:  Option<String>,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      kind:        row.get(1)?,
      fields_json: row.get(2)?,
      created_by:  row.get(3)?,
      updated_by:  row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
      is_deleted:  row.get(7)?,
      deleted_at:  row.get(8)?,
    })
  }

  pub fn decode_meta(&self) -> Result<RecordMeta> {
    let meta = RecordMeta {
      id:         decode_uuid(&self.id)?,
      created_by: Actor(decode_uuid(&self.created_by)?),
      updated_by: Actor(decode_uuid(&self.updated_by)?),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      is_deleted: self.is_deleted,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    };
    if !meta.is_consistent() {
      return Err(Error::Corrupt(format!(
        "record {} has is_deleted={} but deleted_at={:?}",
        self.id, self.is_deleted, self.deleted_at
      )));
    }
    Ok(meta)
  }

  pub fn into_record<T: Entity>(self) -> Result<Record<T>> {
    if self.kind != T::KIND.as_str() {
      return Err(Error::Corrupt(format!(
        "record {} is a {}, expected {}",
        self.id,
        self.kind,
        T::KIND
      )));
    }
    let meta = self.decode_meta()?;
    let fields: T = serde_json::from_str(&self.fields_json)?;
    Ok(Record { meta, fields })
  }
}
