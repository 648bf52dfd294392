//! SQL schema for the tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per tracked tag. `upsert` is the only statement path that touches
-- this table; a tag with no row is untracked.
CREATE TABLE IF NOT EXISTS tags (
    tag_id           TEXT PRIMARY KEY,
    stage            TEXT NOT NULL,   -- 'WAITING' | 'IN_PROGRESS' | 'DONE'
    stage_entered_at TEXT NOT NULL,   -- ISO 8601 UTC; last accepted transition
    last_seen_at     TEXT NOT NULL,   -- ISO 8601 UTC; last observed scan
    attributes_json  TEXT NOT NULL    -- JSON GarmentAttributes snapshot
);

-- Refused transitions are recorded, not raised.
-- This table is strictly append-only; no UPDATE or DELETE is ever issued.
CREATE TABLE IF NOT EXISTS rejections (
    rejection_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    tag_id          TEXT NOT NULL,
    requested_stage TEXT NOT NULL,
    observed_at     TEXT NOT NULL,
    source          TEXT,
    reason          TEXT NOT NULL,   -- 'regression' | 'terminal' | 'stale'
    recorded_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS tags_stage_idx     ON tags(stage);
CREATE INDEX IF NOT EXISTS rejections_tag_idx ON rejections(tag_id);

PRAGMA user_version = 1;
";
