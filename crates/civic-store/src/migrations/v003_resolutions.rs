use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resolutions (
    resolution_id INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id      INTEGER NOT NULL,           -- FK -> issues(issue_id)
    proposer_id   TEXT NOT NULL,              -- FK -> users(user_id)
    kind          TEXT NOT NULL CHECK (kind IN ('self', 'external')),
    status        TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'rejected')),
    respondent_id TEXT,                       -- who may accept / reject
    created_at    TEXT NOT NULL,
    responded_at  TEXT,                       -- RFC-3339, fixed offset

    FOREIGN KEY (issue_id) REFERENCES issues(issue_id) ON DELETE CASCADE,
    FOREIGN KEY (proposer_id) REFERENCES users(user_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_resolutions_issue ON resolutions(issue_id, created_at DESC);

-- At most one pending proposal per issue.
CREATE UNIQUE INDEX IF NOT EXISTS idx_resolutions_one_pending
    ON resolutions(issue_id) WHERE status = 'pending';
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
