//! CRUD operations for [`Comment`] records.
//!
//! The store keeps comments flat.  Arranging them into reply threads is the
//! job of [`civic_shared::Thread`].

use rusqlite::{params, Connection, OptionalExtension};

use civic_shared::{CommentId, IssueId, UserId};

use crate::codec;
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Comment, CommentRecord, NewComment};
use crate::users::{row_to_user, USER_COLUMNS};

const COMMENT_COLUMNS: &str = "m.comment_id, m.issue_id, m.user_id, m.parent_id, m.content, \
     m.is_anonymous, m.created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a comment.  A reply's parent must be a comment on the same
    /// issue.
    pub fn create_comment(&self, new: &NewComment) -> Result<Comment> {
        self.immediate(|tx| {
            let issue_exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM issues WHERE issue_id = ?1",
                    params![new.issue_id.0],
                    |row| row.get(0),
                )
                .optional()?;
            if issue_exists.is_none() {
                return Err(StoreError::NotFound);
            }

            if let Some(parent_id) = new.parent_id {
                let parent_issue: Option<i64> = tx
                    .query_row(
                        "SELECT issue_id FROM comments WHERE comment_id = ?1",
                        params![parent_id.0],
                        |row| row.get(0),
                    )
                    .optional()?;
                match parent_issue {
                    Some(issue) if issue == new.issue_id.0 => {}
                    Some(_) => return Err(StoreError::Invalid("parent comment is on another issue")),
                    None => return Err(StoreError::Invalid("parent comment does not exist")),
                }
            }

            tx.execute(
                "INSERT INTO comments (issue_id, user_id, parent_id, content, is_anonymous, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.issue_id.0,
                    new.user_id.to_string(),
                    new.parent_id.map(|p| p.0),
                    new.content,
                    new.is_anonymous,
                    codec::encode_utc(&codec::now()),
                ],
            )?;

            fetch_comment(tx, CommentId(tx.last_insert_rowid()))
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_comment(&self, id: CommentId) -> Result<Comment> {
        fetch_comment(self.conn(), id)
    }

    /// All comments on an issue, oldest first.  Tree position plays no
    /// part in the order.
    pub fn list_comments(&self, issue_id: IssueId) -> Result<Vec<Comment>> {
        Ok(self
            .list_comment_records(issue_id)?
            .into_iter()
            .map(|r| r.comment)
            .collect())
    }

    /// Comments joined with their authors, oldest first.
    pub fn list_comment_records(&self, issue_id: IssueId) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COMMENT_COLUMNS}, {USER_COLUMNS}
             FROM comments m
             JOIN users u ON u.user_id = m.user_id
             WHERE m.issue_id = ?1
             ORDER BY m.created_at ASC, m.comment_id ASC"
        ))?;

        let rows = stmt.query_map(params![issue_id.0], |row| {
            Ok(CommentRecord {
                comment: row_to_comment(row)?,
                author: row_to_user(row, 7)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn get_comment_record(&self, id: CommentId) -> Result<CommentRecord> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {COMMENT_COLUMNS}, {USER_COLUMNS}
                     FROM comments m
                     JOIN users u ON u.user_id = m.user_id
                     WHERE m.comment_id = ?1"
                ),
                params![id.0],
                |row| {
                    Ok(CommentRecord {
                        comment: row_to_comment(row)?,
                        author: row_to_user(row, 7)?,
                    })
                },
            )
            .map_err(not_found)
    }

    pub fn count_comments(&self, issue_id: IssueId) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM comments WHERE issue_id = ?1",
            params![issue_id.0],
            |row| row.get(0),
        )?)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a comment written by `user_id`.  Its replies move up to the
    /// top level of the thread.
    pub fn delete_comment(&self, id: CommentId, user_id: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM comments WHERE comment_id = ?1 AND user_id = ?2",
            params![id.0, user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fetch_comment(conn: &Connection, id: CommentId) -> Result<Comment> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments m WHERE m.comment_id = ?1"),
        params![id.0],
        row_to_comment,
    )
    .map_err(not_found)
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let user_str: String = row.get(2)?;
    let created_str: String = row.get(6)?;

    Ok(Comment {
        comment_id: CommentId(row.get(0)?),
        issue_id: IssueId(row.get(1)?),
        user_id: codec::user_id(2, &user_str)?,
        parent_id: row.get::<_, Option<i64>>(3)?.map(CommentId),
        content: row.get(4)?,
        is_anonymous: row.get(5)?,
        created_at: codec::utc(6, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use civic_shared::Thread;

    fn comment(
        fx: &Fixture,
        issue: IssueId,
        user: UserId,
        parent: Option<CommentId>,
        text: &str,
    ) -> Result<Comment> {
        fx.db.create_comment(&NewComment {
            issue_id: issue,
            user_id: user,
            parent_id: parent,
            content: text.to_string(),
            is_anonymous: false,
        })
    }

    #[test]
    fn test_create_list_and_count() {
        let fx = Fixture::new();
        let issue = fx.issue_by(&fx.alice, fx.roads, "Broken streetlight");

        let root = comment(&fx, issue, fx.bob.user_id, None, "Same on my street").unwrap();
        let reply =
            comment(&fx, issue, fx.alice.user_id, Some(root.comment_id), "Reported it").unwrap();
        assert_eq!(reply.parent_id, Some(root.comment_id));

        assert_eq!(fx.db.count_comments(issue).unwrap(), 2);
        let listed = fx.db.list_comments(issue).unwrap();
        assert_eq!(listed, vec![root.clone(), reply.clone()]);

        let thread = Thread::build(listed);
        let replies: Vec<_> = thread.replies(root.comment_id).collect();
        assert_eq!(replies, vec![&reply]);
    }

    #[test]
    fn test_parent_on_other_issue_rejected() {
        let fx = Fixture::new();
        let first = fx.issue_by(&fx.alice, fx.roads, "one");
        let second = fx.issue_by(&fx.alice, fx.roads, "two");
        let root = comment(&fx, first, fx.bob.user_id, None, "hi").unwrap();

        let res = comment(&fx, second, fx.bob.user_id, Some(root.comment_id), "wrong");
        assert!(matches!(res, Err(StoreError::Invalid(_))));

        let res = comment(&fx, second, fx.bob.user_id, Some(CommentId(4040)), "ghost");
        assert!(matches!(res, Err(StoreError::Invalid(_))));
        assert_eq!(fx.db.count_comments(second).unwrap(), 0);
    }

    #[test]
    fn test_comment_on_missing_issue() {
        let fx = Fixture::new();
        let res = comment(&fx, IssueId(77), fx.bob.user_id, None, "hello?");
        assert!(matches!(res, Err(StoreError::NotFound)));
    }

    #[test]
    fn test_delete_orphans_replies_to_root() {
        let fx = Fixture::new();
        let issue = fx.issue_by(&fx.alice, fx.roads, "Leak");
        let root = comment(&fx, issue, fx.bob.user_id, None, "root").unwrap();
        let reply =
            comment(&fx, issue, fx.alice.user_id, Some(root.comment_id), "reply").unwrap();

        assert!(matches!(
            fx.db.delete_comment(root.comment_id, fx.alice.user_id),
            Err(StoreError::NotFound)
        ));
        fx.db.delete_comment(root.comment_id, fx.bob.user_id).unwrap();

        let orphan = fx.db.get_comment(reply.comment_id).unwrap();
        assert_eq!(orphan.parent_id, None);
        assert_eq!(fx.db.count_comments(issue).unwrap(), 1);
    }

    #[test]
    fn test_issue_delete_cascades_comments() {
        let fx = Fixture::new();
        let issue = fx.issue_by(&fx.alice, fx.roads, "Gone soon");
        comment(&fx, issue, fx.bob.user_id, None, "bye").unwrap();

        fx.db.delete_issue(issue, fx.alice.user_id).unwrap();
        assert_eq!(fx.db.count_comments(issue).unwrap(), 0);
    }
}
