//! CRUD operations for [`Issue`] records.
//!
//! Reads come in two shapes: the bare [`Issue`] row, and the
//! [`IssueRecord`] joined with author, category and location that the
//! server composes into client views.

use chrono::{DateTime, FixedOffset};
use rusqlite::{params, Connection, OptionalExtension};

use civic_shared::{CategoryId, IssueId, IssueStatus, LocationId, UserId};

use crate::categories::{category_exists, row_to_location, upsert_location};
use crate::codec;
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Category, Issue, IssueChanges, IssueFilter, IssueRecord, NewIssue};
use crate::users::{row_to_user, USER_COLUMNS};

const ISSUE_COLUMNS: &str = "i.issue_id, i.user_id, i.category_id, i.content, i.sentiment, \
     i.location_id, i.is_anonymous, i.status, i.created_at, i.resolved_at";

/// Column offsets inside a record row.
const AUTHOR_AT: usize = 10;
const CATEGORY_AT: usize = 16;
const LOCATION_AT: usize = 18;

fn record_select() -> String {
    format!(
        "SELECT {ISSUE_COLUMNS}, {USER_COLUMNS},
                c.category_id, c.name,
                l.location_id, l.place_id, l.province, l.city, l.suburb, l.district
         FROM issues i
         JOIN users u ON u.user_id = i.user_id
         JOIN categories c ON c.category_id = i.category_id
         LEFT JOIN locations l ON l.location_id = i.location_id"
    )
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new open issue, creating its location on first use.
    pub fn create_issue(&self, new: &NewIssue) -> Result<Issue> {
        self.immediate(|tx| {
            if !category_exists(tx, new.category_id)? {
                return Err(StoreError::Invalid("unknown category"));
            }

            let location_id = match &new.location {
                Some(loc) if !loc.place_id.is_empty() => Some(upsert_location(tx, loc)?),
                _ => None,
            };

            tx.execute(
                "INSERT INTO issues
                    (user_id, category_id, content, sentiment, location_id, is_anonymous, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new.user_id.to_string(),
                    new.category_id.0,
                    new.content,
                    new.sentiment,
                    location_id.map(|l| l.0),
                    new.is_anonymous,
                    IssueStatus::Open.as_str(),
                    codec::encode_utc(&codec::now()),
                ],
            )?;

            let issue = fetch_issue(tx, IssueId(tx.last_insert_rowid()))?;
            tracing::debug!(issue = %issue.issue_id, user = %issue.user_id.short(), "issue created");
            Ok(issue)
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_issue(&self, id: IssueId) -> Result<Issue> {
        fetch_issue(self.conn(), id)
    }

    pub fn get_issue_record(&self, id: IssueId) -> Result<IssueRecord> {
        self.conn()
            .query_row(
                &format!("{} WHERE i.issue_id = ?1", record_select()),
                params![id.0],
                row_to_record,
            )
            .map_err(not_found)
    }

    /// Newest-first page of the issue feed.
    ///
    /// An unknown category name yields an empty page.
    pub fn list_issue_records(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>> {
        let category_id = match &filter.category {
            Some(name) => match self.category_id_by_name(name)? {
                Some(id) => Some(id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut stmt = self.conn().prepare(&format!(
            "{}
             WHERE (?1 IS NULL OR i.category_id = ?1)
               AND (?2 IS NULL OR i.sentiment = ?2)
             ORDER BY i.created_at DESC, i.issue_id DESC
             LIMIT ?3 OFFSET ?4",
            record_select()
        ))?;

        let rows = stmt.query_map(
            params![
                category_id.map(|c| c.0),
                filter.mood,
                filter.amount,
                filter.from
            ],
            row_to_record,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Every issue reported by `user_id`, newest first.  With
    /// `resolved_only`, just the resolved ones.
    pub fn list_user_issue_records(
        &self,
        user_id: UserId,
        resolved_only: bool,
    ) -> Result<Vec<IssueRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "{}
             WHERE i.user_id = ?1
               AND (?2 = 0 OR i.status = 'resolved')
             ORDER BY i.created_at DESC, i.issue_id DESC",
            record_select()
        ))?;

        let rows = stmt.query_map(params![user_id.to_string(), resolved_only], row_to_record)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// `true` if `user_id` has reported at least one issue in `category_id`.
    pub fn has_user_issues_in_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM issues WHERE user_id = ?1 AND category_id = ?2 LIMIT 1",
                params![user_id.to_string(), category_id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply author edits.  Fails with [`StoreError::NotFound`] when the
    /// issue does not exist or is not owned by `user_id`.
    pub fn update_issue(
        &self,
        id: IssueId,
        user_id: UserId,
        changes: &IssueChanges,
    ) -> Result<Issue> {
        self.immediate(|tx| {
            if let Some(category_id) = changes.category_id {
                if !category_exists(tx, category_id)? {
                    return Err(StoreError::Invalid("unknown category"));
                }
            }

            let affected = tx.execute(
                "UPDATE issues SET
                    category_id  = COALESCE(?3, category_id),
                    content      = COALESCE(?4, content),
                    sentiment    = COALESCE(?5, sentiment),
                    is_anonymous = COALESCE(?6, is_anonymous)
                 WHERE issue_id = ?1 AND user_id = ?2",
                params![
                    id.0,
                    user_id.to_string(),
                    changes.category_id.map(|c| c.0),
                    changes.content,
                    changes.sentiment,
                    changes.is_anonymous,
                ],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }

            fetch_issue(tx, id)
        })
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an issue owned by `user_id`.  Comments, reactions and
    /// resolutions go with it.
    pub fn delete_issue(&self, id: IssueId, user_id: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM issues WHERE issue_id = ?1 AND user_id = ?2",
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

pub(crate) fn fetch_issue(conn: &Connection, id: IssueId) -> Result<Issue> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.issue_id = ?1"),
        params![id.0],
        |row| row_to_issue(row, 0),
    )
    .map_err(not_found)
}

/// Write the authoritative resolution state of an issue.
pub(crate) fn set_issue_status(
    conn: &Connection,
    id: IssueId,
    status: IssueStatus,
    resolved_at: Option<&DateTime<FixedOffset>>,
) -> Result<()> {
    let affected = conn.execute(
        "UPDATE issues SET status = ?2, resolved_at = ?3 WHERE issue_id = ?1",
        params![id.0, status.as_str(), resolved_at.map(codec::encode_fixed)],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Map the [`ISSUE_COLUMNS`] block starting at column `at`.
fn row_to_issue(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Issue> {
    let user_str: String = row.get(at + 1)?;
    let status_str: String = row.get(at + 7)?;
    let created_str: String = row.get(at + 8)?;
    let resolved_str: Option<String> = row.get(at + 9)?;

    Ok(Issue {
        issue_id: IssueId(row.get(at)?),
        user_id: codec::user_id(at + 1, &user_str)?,
        category_id: CategoryId(row.get(at + 2)?),
        content: row.get(at + 3)?,
        sentiment: row.get(at + 4)?,
        location_id: row.get::<_, Option<i64>>(at + 5)?.map(LocationId),
        is_anonymous: row.get(at + 6)?,
        status: codec::variant(at + 7, &status_str)?,
        created_at: codec::utc(at + 8, &created_str)?,
        resolved_at: resolved_str
            .map(|s| codec::fixed(at + 9, &s))
            .transpose()?,
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<IssueRecord> {
    let location = match row.get::<_, Option<i64>>(LOCATION_AT)? {
        Some(_) => Some(row_to_location(row, LOCATION_AT)?),
        None => None,
    };

    Ok(IssueRecord {
        issue: row_to_issue(row, 0)?,
        author: row_to_user(row, AUTHOR_AT)?,
        category: Category {
            category_id: CategoryId(row.get(CATEGORY_AT)?),
            name: row.get(CATEGORY_AT + 1)?,
        },
        location,
    })
}
