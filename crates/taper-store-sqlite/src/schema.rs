//! SQL schema for the Taper SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS providers (
    provider_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

-- Metric columns are nullable REALs. NULL means the engine could not detect
-- that metric; zero is a legitimate stored value.
CREATE TABLE IF NOT EXISTS measurements (
    measurement_id      TEXT PRIMARY KEY,
    subject_id          TEXT NOT NULL REFERENCES subjects(subject_id),
    height              REAL NOT NULL,
    shoulder_width      REAL,
    chest_circumference REAL,
    waist_circumference REAL,
    hip_circumference   REAL,
    neck_circumference  REAL,
    bicep_circumference REAL,
    wrist_circumference REAL,
    thigh_circumference REAL,
    sleeve_length       REAL,
    upper_arm_length    REAL,
    inseam              REAL,
    torso_length        REAL,
    front_image         TEXT NOT NULL,
    side_image          TEXT NOT NULL,
    metadata            TEXT,            -- JSON engine diagnostics
    confidence          TEXT,            -- JSON detection flags
    notes               TEXT,
    is_favorite         INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at          TEXT NOT NULL
);

-- Share rows are removed by explicit application-level SQL in the same
-- transaction that deletes their measurement; no FK ON DELETE CASCADE.
CREATE TABLE IF NOT EXISTS shared_measurements (
    share_id       TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL REFERENCES subjects(subject_id),
    measurement_id TEXT NOT NULL REFERENCES measurements(measurement_id),
    provider_id    TEXT NOT NULL REFERENCES providers(provider_id),
    status         TEXT NOT NULL DEFAULT 'pending',
    message        TEXT,
    provider_notes TEXT,
    viewed_at      TEXT,
    shared_at      TEXT NOT NULL,
    UNIQUE (measurement_id, provider_id)
);

CREATE INDEX IF NOT EXISTS measurements_subject_idx ON measurements(subject_id);
CREATE INDEX IF NOT EXISTS measurements_created_idx ON measurements(created_at);
CREATE INDEX IF NOT EXISTS shares_subject_idx  ON shared_measurements(subject_id);
CREATE INDEX IF NOT EXISTS shares_provider_idx ON shared_measurements(provider_id);

PRAGMA user_version = 1;
";
