//! SQL schema for the Folio SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per record of any kind. Entity fields live in fields_json; the
-- identity, audit and soft-delete columns are shared by every kind.
CREATE TABLE IF NOT EXISTS records (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,   -- EntityKind discriminant
    fields_json TEXT NOT NULL,
    slug        TEXT,            -- copied out of fields_json for uniqueness
    created_by  TEXT NOT NULL,
    updated_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at  TEXT NOT NULL,
    is_deleted  INTEGER NOT NULL DEFAULT 0,
    deleted_at  TEXT,
    CHECK ((is_deleted = 0 AND deleted_at IS NULL)
        OR (is_deleted = 1 AND deleted_at IS NOT NULL))
);

-- Outgoing references, rewritten whenever the source record is written.
-- Rows go away with their source; nothing cascades from the target side.
CREATE TABLE IF NOT EXISTS record_refs (
    source_id TEXT NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    relation  TEXT NOT NULL,
    target_id TEXT NOT NULL,
    PRIMARY KEY (source_id, relation, target_id)
);

CREATE INDEX IF NOT EXISTS records_kind_idx    ON records(kind, is_deleted, created_at);
CREATE UNIQUE INDEX IF NOT EXISTS records_slug_idx ON records(kind, slug);
CREATE INDEX IF NOT EXISTS record_refs_target_idx ON record_refs(target_id, relation);

PRAGMA user_version = 1;
";
