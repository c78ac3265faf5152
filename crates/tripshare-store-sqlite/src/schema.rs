//! SQL schema for the Tripshare SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    display_name      TEXT NOT NULL,
    rating            REAL NOT NULL DEFAULT 0,
    number_of_reviews INTEGER NOT NULL DEFAULT 0 CHECK (number_of_reviews >= 0),
    application_ids   TEXT NOT NULL DEFAULT '[]',   -- JSON array of UUIDs
    version           INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL
);

-- Counters are written only by the capacity protocol.
CREATE TABLE IF NOT EXISTS proposals (
    proposal_id                TEXT PRIMARY KEY,
    organizer_id               TEXT NOT NULL REFERENCES users(user_id),
    title                      TEXT NOT NULL,
    max_participants           INTEGER NOT NULL CHECK (max_participants > 0),
    participants_count         INTEGER NOT NULL,
    pending_applications_count INTEGER NOT NULL CHECK (pending_applications_count >= 0),
    status                     TEXT NOT NULL,   -- 'published' | 'full' | 'concluded'
    application_ids            TEXT NOT NULL DEFAULT '[]',
    version                    INTEGER NOT NULL DEFAULT 0,
    created_at                 TEXT NOT NULL,
    CHECK (participants_count BETWEEN 0 AND max_participants)
);

CREATE TABLE IF NOT EXISTS applications (
    application_id TEXT PRIMARY KEY,
    proposal_id    TEXT NOT NULL REFERENCES proposals(proposal_id),
    user_id        TEXT NOT NULL REFERENCES users(user_id),
    status         TEXT NOT NULL,   -- 'pending' | 'accepted' | 'rejected' | 'cancelled'
    guests         TEXT NOT NULL DEFAULT '[]',
    motivation     TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

-- proposal_id is informational; reviews outlive deleted proposals.
CREATE TABLE IF NOT EXISTS reviews (
    review_id        TEXT PRIMARY KEY,
    reviewed_user_id TEXT NOT NULL REFERENCES users(user_id),
    reviewer_id      TEXT NOT NULL REFERENCES users(user_id),
    proposal_id      TEXT,
    rating           REAL NOT NULL,
    comment          TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

-- Outbox for push delivery. Append-only.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    recipient_id    TEXT NOT NULL REFERENCES users(user_id),
    kind            TEXT NOT NULL,
    title           TEXT NOT NULL,
    body            TEXT NOT NULL,
    data_json       TEXT NOT NULL DEFAULT '{}',
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS applications_proposal_idx ON applications(proposal_id, status);
CREATE INDEX IF NOT EXISTS applications_user_idx     ON applications(user_id);
CREATE INDEX IF NOT EXISTS reviews_reviewed_idx      ON reviews(reviewed_user_id);
CREATE INDEX IF NOT EXISTS notifications_recipient_idx ON notifications(recipient_id);

PRAGMA user_version = 1;
";
