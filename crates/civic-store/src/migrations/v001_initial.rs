//! v001 -- Initial schema creation.
//!
//! Creates the core tables: `users`, `sessions`, `categories`, `locations`
//! and `issues`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    username      TEXT NOT NULL UNIQUE,
    fullname      TEXT NOT NULL,
    email_address TEXT NOT NULL,
    image_url     TEXT,
    created_at    TEXT NOT NULL               -- RFC-3339, UTC
);

-- ----------------------------------------------------------------
-- Sessions (bearer token -> user)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY NOT NULL,     -- hex-encoded random bytes
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Categories
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS categories (
    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE
);

-- ----------------------------------------------------------------
-- Locations (deduplicated by external place id)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS locations (
    location_id INTEGER PRIMARY KEY AUTOINCREMENT,
    place_id    TEXT NOT NULL UNIQUE,
    province    TEXT,
    city        TEXT,
    suburb      TEXT,
    district    TEXT
);

-- ----------------------------------------------------------------
-- Issues
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS issues (
    issue_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      TEXT NOT NULL,               -- FK -> users(user_id)
    category_id  INTEGER NOT NULL,            -- FK -> categories(category_id)
    content      TEXT NOT NULL CHECK (length(content) <= 500),
    sentiment    TEXT NOT NULL,
    location_id  INTEGER,                     -- nullable FK -> locations
    is_anonymous INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    status       TEXT NOT NULL DEFAULT 'open',
    created_at   TEXT NOT NULL,               -- RFC-3339, UTC
    resolved_at  TEXT,                        -- RFC-3339, fixed offset

    CHECK ((status = 'resolved') = (resolved_at IS NOT NULL)),
    FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE,
    FOREIGN KEY (category_id) REFERENCES categories(category_id),
    FOREIGN KEY (location_id) REFERENCES locations(location_id)
);

CREATE INDEX IF NOT EXISTS idx_issues_created ON issues(created_at DESC, issue_id DESC);
CREATE INDEX IF NOT EXISTS idx_issues_user ON issues(user_id);
CREATE INDEX IF NOT EXISTS idx_issues_category_user ON issues(category_id, user_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
