//! SQL schema for the Strato SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `time_start`/`time_end` are the derived unix-seconds cache of the
/// extent timestamps, kept as integer columns so the two active-set range
/// queries stay index-only. `remote_outcome` is written after the fact by
/// the post-write enrichment step and is NULL until then.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS constraints (
    constraint_id  TEXT PRIMARY KEY,
    category       TEXT NOT NULL,      -- 'STC' | 'LTC' | 'UVR' | 'Geozone'
    version        INTEGER NOT NULL,   -- >= 1, +1 per accepted update
    state          TEXT NOT NULL,      -- always 'Accepted' once stored
    extent_json    TEXT NOT NULL,      -- full Extent, serialised
    time_start     INTEGER NOT NULL,   -- unix seconds, derived
    time_end       INTEGER NOT NULL,   -- unix seconds, derived
    uss_base_url   TEXT NOT NULL,
    time_created   TEXT NOT NULL,      -- RFC 3339 UTC; server-assigned
    time_updated   TEXT NOT NULL,
    remote_outcome TEXT                -- JSON RemoteOutcome or NULL
);

CREATE INDEX IF NOT EXISTS constraints_state_end_idx
    ON constraints(state, time_end);
CREATE INDEX IF NOT EXISTS constraints_category_end_idx
    ON constraints(category, time_end);

PRAGMA user_version = 1;
";
