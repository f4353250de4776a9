use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Flat comment store; replies point at their parent on the same issue.
-- Deleting a parent orphans its replies to the root level.
CREATE TABLE IF NOT EXISTS comments (
    comment_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id     INTEGER NOT NULL,            -- FK -> issues(issue_id)
    user_id      TEXT NOT NULL,               -- FK -> users(user_id)
    parent_id    INTEGER,                     -- nullable FK -> comments
    content      TEXT NOT NULL CHECK (length(content) <= 500),
    is_anonymous INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,

    FOREIGN KEY (issue_id) REFERENCES issues(issue_id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE,
    FOREIGN KEY (parent_id) REFERENCES comments(comment_id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id, created_at);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

-- One reaction slot per (issue, user).
CREATE TABLE IF NOT EXISTS reactions (
    issue_id   INTEGER NOT NULL,              -- FK -> issues(issue_id)
    user_id    TEXT NOT NULL,                 -- FK -> users(user_id)
    emoji      TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (issue_id, user_id),
    FOREIGN KEY (issue_id) REFERENCES issues(issue_id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
