//! The reaction ledger: one reaction slot per (issue, user).

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use civic_shared::{IssueId, ReactionKind, ReactionSummary, UserId};

use crate::codec;
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};

impl Database {
    /// Toggle `kind` on `issue_id` for `user_id`.
    ///
    /// - no reaction yet: `kind` is recorded;
    /// - same kind again: the reaction is removed;
    /// - different kind: the existing row is updated in place.
    ///
    /// Runs in one transaction against the `(issue_id, user_id)` primary
    /// key, so concurrent toggles by the same user serialize and never leave
    /// two rows behind.
    pub fn set_reaction(
        &self,
        issue_id: IssueId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> Result<ReactionSummary> {
        self.immediate(|tx| {
            tx.query_row(
                "SELECT 1 FROM issues WHERE issue_id = ?1",
                params![issue_id.0],
                |row| row.get::<_, i64>(0),
            )
            .map_err(not_found)?;

            let current = fetch_user_reaction(tx, issue_id, user_id)?;
            let user = user_id.to_string();

            let user_reaction = match current {
                None => {
                    tx.execute(
                        "INSERT INTO reactions (issue_id, user_id, emoji, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            issue_id.0,
                            user,
                            kind.as_str(),
                            codec::encode_utc(&codec::now())
                        ],
                    )?;
                    Some(kind)
                }
                Some(existing) if existing == kind => {
                    tx.execute(
                        "DELETE FROM reactions WHERE issue_id = ?1 AND user_id = ?2",
                        params![issue_id.0, user],
                    )?;
                    None
                }
                Some(_) => {
                    tx.execute(
                        "UPDATE reactions SET emoji = ?3 WHERE issue_id = ?1 AND user_id = ?2",
                        params![issue_id.0, user, kind.as_str()],
                    )?;
                    Some(kind)
                }
            };

            tracing::debug!(
                issue = %issue_id,
                user = %user_id.short(),
                ?current,
                ?user_reaction,
                "reaction toggled"
            );

            Ok(ReactionSummary {
                user_reaction,
                reactions: fetch_counts(tx, issue_id)?,
            })
        })
    }

    /// Count per kind for an issue.
    pub fn reaction_counts(&self, issue_id: IssueId) -> Result<BTreeMap<ReactionKind, i64>> {
        fetch_counts(self.conn(), issue_id)
    }

    /// The kind `user_id` currently holds on `issue_id`, if any.
    pub fn user_reaction(&self, issue_id: IssueId, user_id: UserId) -> Result<Option<ReactionKind>> {
        fetch_user_reaction(self.conn(), issue_id, user_id)
    }

    /// Counts plus the viewer's own reaction.  Anonymous viewers get
    /// counts only.
    pub fn reaction_summary(
        &self,
        issue_id: IssueId,
        viewer: Option<UserId>,
    ) -> Result<ReactionSummary> {
        let user_reaction = match viewer {
            Some(user_id) => self.user_reaction(issue_id, user_id)?,
            None => None,
        };
        Ok(ReactionSummary {
            user_reaction,
            reactions: self.reaction_counts(issue_id)?,
        })
    }
}

fn fetch_user_reaction(
    conn: &Connection,
    issue_id: IssueId,
    user_id: UserId,
) -> Result<Option<ReactionKind>> {
    let emoji: Option<String> = conn
        .query_row(
            "SELECT emoji FROM reactions WHERE issue_id = ?1 AND user_id = ?2",
            params![issue_id.0, user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    emoji
        .map(|e| e.parse::<ReactionKind>().map_err(StoreError::Parse))
        .transpose()
}

fn fetch_counts(conn: &Connection, issue_id: IssueId) -> Result<BTreeMap<ReactionKind, i64>> {
    let mut stmt = conn.prepare(
        "SELECT emoji, COUNT(*) FROM reactions WHERE issue_id = ?1 GROUP BY emoji",
    )?;
    let rows = stmt.query_map(params![issue_id.0], |row| {
        let emoji: String = row.get(0)?;
        Ok((codec::variant::<ReactionKind>(0, &emoji)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = BTreeMap::new();
    for row in rows {
        let (kind, count) = row?;
        counts.insert(kind, count);
    }
    Ok(counts)
}
