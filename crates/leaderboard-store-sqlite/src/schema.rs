//! SQL schema for the leaderboard SQLite store.
//!
//! Executed once at connection startup. Every statement is idempotent, so
//! re-running it against an existing database is harmless.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contributors (
    username    TEXT PRIMARY KEY,
    name        TEXT,
    role        TEXT,
    avatar_url  TEXT,
    meta        TEXT             -- JSON object or NULL
);

CREATE TABLE IF NOT EXISTS activity_definitions (
    slug        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    points      INTEGER,
    icon        TEXT
);

-- Re-ingesting a slug overwrites the descriptive columns.
CREATE TABLE IF NOT EXISTS activities (
    slug                TEXT PRIMARY KEY,
    contributor         TEXT NOT NULL REFERENCES contributors(username),
    activity_definition TEXT NOT NULL REFERENCES activity_definitions(slug),
    title               TEXT,
    occurred_at         TEXT NOT NULL,   -- RFC 3339 UTC
    link                TEXT,
    text                TEXT,
    points              INTEGER,
    meta                TEXT
);

CREATE TABLE IF NOT EXISTS badge_definitions (
    slug        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    variants    TEXT NOT NULL    -- JSON object keyed by variant id
);

-- Awards are insert-only: rows are never updated once written.
CREATE TABLE IF NOT EXISTS contributor_badges (
    slug        TEXT PRIMARY KEY,  -- {badge}__{contributor}__{variant}
    badge       TEXT NOT NULL REFERENCES badge_definitions(slug),
    contributor TEXT NOT NULL REFERENCES contributors(username),
    variant     TEXT NOT NULL,
    achieved_on TEXT NOT NULL,     -- YYYY-MM-DD
    meta        TEXT
);

CREATE TABLE IF NOT EXISTS aggregate_definitions (
    slug        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS global_aggregates (
    slug        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    value       TEXT NOT NULL,   -- JSON {\"type\": ..., \"value\": ...}
    meta        TEXT
);

CREATE TABLE IF NOT EXISTS contributor_aggregates (
    aggregate   TEXT NOT NULL REFERENCES aggregate_definitions(slug),
    contributor TEXT NOT NULL REFERENCES contributors(username),
    value       TEXT NOT NULL,
    meta        TEXT,
    PRIMARY KEY (aggregate, contributor)
);

CREATE INDEX IF NOT EXISTS activities_contributor_idx ON activities(contributor);
CREATE INDEX IF NOT EXISTS activities_definition_idx  ON activities(activity_definition);
CREATE INDEX IF NOT EXISTS activities_occurred_idx    ON activities(occurred_at);
CREATE INDEX IF NOT EXISTS badges_contributor_idx     ON contributor_badges(contributor);

PRAGMA user_version = 1;
";

/// Drops every table, children first. Followed by [`SCHEMA`] on reset.
pub const DROP_ALL: &str = "
DROP TABLE IF EXISTS contributor_aggregates;
DROP TABLE IF EXISTS global_aggregates;
DROP TABLE IF EXISTS aggregate_definitions;
DROP TABLE IF EXISTS contributor_badges;
DROP TABLE IF EXISTS badge_definitions;
DROP TABLE IF EXISTS activities;
DROP TABLE IF EXISTS activity_definitions;
DROP TABLE IF EXISTS contributors;
";
