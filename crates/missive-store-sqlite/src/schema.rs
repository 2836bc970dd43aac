//! SQL schema for the Missive SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision; future migrations will be gated on that number.

pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Double opt-in funnel. A row is never deleted.
CREATE TABLE IF NOT EXISTS subscribers (
    subscriber_id    TEXT PRIMARY KEY,
    email            TEXT NOT NULL UNIQUE,   -- normalised (trimmed, lowercase)
    confirmed        INTEGER NOT NULL DEFAULT 0,
    token            TEXT UNIQUE,            -- NULL once confirmed
    token_expires_at TEXT,                   -- ISO 8601 UTC or NULL (no expiry)
    created_at       TEXT NOT NULL,
    confirmed_at     TEXT,
    CHECK (confirmed = 0 OR token IS NULL)
);

-- Messages are append-only; no UPDATE or DELETE is ever issued.
CREATE TABLE IF NOT EXISTS messages (
    message_id    TEXT PRIMARY KEY,
    subscriber_id TEXT NOT NULL REFERENCES subscribers(subscriber_id),
    content       TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS social_users (
    social_user_id   TEXT PRIMARY KEY,
    provider         TEXT NOT NULL,
    provider_subject TEXT NOT NULL,
    name             TEXT,
    email            TEXT,
    avatar_url       TEXT,
    created_at       TEXT NOT NULL,
    UNIQUE (provider, provider_subject)
);

CREATE INDEX IF NOT EXISTS messages_subscriber_idx ON messages(subscriber_id);
CREATE INDEX IF NOT EXISTS subscribers_confirmed_idx ON subscribers(confirmed, created_at);

PRAGMA user_version = 1;
";
