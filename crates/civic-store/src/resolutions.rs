//! Persistence for the resolution workflow.
//!
//! Every operation reads the issue's current [`IssueStatus`], asks the state
//! machine for the next one, and writes the resolution row together with the
//! new status inside a single `IMMEDIATE` transaction.  The partial unique
//! index on pending rows backs the "one pending proposal" rule at the schema
//! level.

use chrono::FixedOffset;
use rusqlite::{params, Connection};

use civic_shared::{
    IssueId, IssueStatus, ResolutionEvent, ResolutionId, ResolutionKind, ResolutionStatus,
    TransitionError, UserId,
};

use crate::codec;
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::issues::{fetch_issue, set_issue_status};
use crate::models::Resolution;

const RESOLUTION_COLUMNS: &str = "resolution_id, issue_id, proposer_id, kind, status, \
     respondent_id, created_at, responded_at";

impl Database {
    /// The author marks their own issue resolved.  The proposal is accepted
    /// on the spot and `resolved_at` is stamped at `offset`.
    pub fn create_self_resolution(
        &self,
        issue_id: IssueId,
        user_id: UserId,
        offset: FixedOffset,
    ) -> Result<Resolution> {
        self.immediate(|tx| {
            let issue = fetch_issue(tx, issue_id)?;
            if issue.user_id != user_id {
                return Err(StoreError::Forbidden("only the author can self-resolve"));
            }

            let next = issue.status.self_resolve()?;
            let now = codec::now();
            let resolved_at = now.with_timezone(&offset);

            let id = insert_resolution(
                tx,
                issue_id,
                user_id,
                ResolutionKind::SelfResolution,
                ResolutionStatus::Accepted,
                user_id,
            )?;
            tx.execute(
                "UPDATE resolutions SET responded_at = ?2 WHERE resolution_id = ?1",
                params![id.0, codec::encode_fixed(&resolved_at)],
            )?;
            set_issue_status(tx, issue_id, next, Some(&resolved_at))?;

            tracing::info!(issue = %issue_id, resolution = %id, "issue self-resolved");
            fetch_resolution(tx, id)
        })
    }

    /// Another user proposes that an issue is resolved.  The author becomes
    /// the respondent; nothing is stamped until they accept.
    pub fn create_external_resolution(
        &self,
        issue_id: IssueId,
        proposer_id: UserId,
    ) -> Result<Resolution> {
        self.immediate(|tx| {
            let issue = fetch_issue(tx, issue_id)?;
            if issue.user_id == proposer_id {
                return Err(StoreError::Invalid(
                    "the author cannot propose an external resolution",
                ));
            }

            let next = issue
                .status
                .transition(ResolutionEvent::Propose(ResolutionKind::External))?;

            let id = insert_resolution(
                tx,
                issue_id,
                proposer_id,
                ResolutionKind::External,
                ResolutionStatus::Pending,
                issue.user_id,
            )?;
            set_issue_status(tx, issue_id, next, None)?;

            tracing::info!(
                issue = %issue_id,
                resolution = %id,
                proposer = %proposer_id.short(),
                "external resolution proposed"
            );
            fetch_resolution(tx, id)
        })
    }

    /// Accept or reject a pending proposal.  Only the designated respondent
    /// may answer.  Accepting stamps `resolved_at` at `offset`; rejecting
    /// leaves it empty.
    pub fn respond_to_resolution(
        &self,
        resolution_id: ResolutionId,
        user_id: UserId,
        accept: bool,
        offset: FixedOffset,
    ) -> Result<Resolution> {
        self.immediate(|tx| {
            let resolution = fetch_resolution(tx, resolution_id)?;
            if resolution.status != ResolutionStatus::Pending {
                return Err(StoreError::NotFound);
            }
            if resolution.respondent_id != Some(user_id) {
                return Err(StoreError::Forbidden(
                    "only the designated respondent can answer",
                ));
            }

            let issue = fetch_issue(tx, resolution.issue_id)?;
            let (event, status) = if accept {
                (ResolutionEvent::Accept, ResolutionStatus::Accepted)
            } else {
                (ResolutionEvent::Reject, ResolutionStatus::Rejected)
            };
            let next = issue.status.transition(event)?;

            let responded_at = codec::now_at(offset);
            tx.execute(
                "UPDATE resolutions SET status = ?2, responded_at = ?3 WHERE resolution_id = ?1",
                params![
                    resolution_id.0,
                    status.as_str(),
                    codec::encode_fixed(&responded_at)
                ],
            )?;
            let resolved_at = next.is_resolved().then_some(&responded_at);
            set_issue_status(tx, issue.issue_id, next, resolved_at)?;

            tracing::info!(
                issue = %issue.issue_id,
                resolution = %resolution_id,
                status = status.as_str(),
                "resolution answered"
            );
            fetch_resolution(tx, resolution_id)
        })
    }

    /// Every proposal made on an issue, newest first.
    pub fn resolutions_for_issue(&self, issue_id: IssueId) -> Result<Vec<Resolution>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RESOLUTION_COLUMNS} FROM resolutions
             WHERE issue_id = ?1
             ORDER BY created_at DESC, resolution_id DESC"
        ))?;

        let rows = stmt.query_map(params![issue_id.0], row_to_resolution)?;
        let mut resolutions = Vec::new();
        for row in rows {
            resolutions.push(row?);
        }
        Ok(resolutions)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_resolution(
    conn: &Connection,
    issue_id: IssueId,
    proposer_id: UserId,
    kind: ResolutionKind,
    status: ResolutionStatus,
    respondent_id: UserId,
) -> Result<ResolutionId> {
    let inserted = conn.execute(
        "INSERT INTO resolutions
            (issue_id, proposer_id, kind, status, respondent_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            issue_id.0,
            proposer_id.to_string(),
            kind.as_str(),
            status.as_str(),
            respondent_id.to_string(),
            codec::encode_utc(&codec::now()),
        ],
    );

    match inserted {
        Ok(_) => Ok(ResolutionId(conn.last_insert_rowid())),
        // The partial unique index caught a second pending row.
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::Conflict(TransitionError::PendingExists))
        }
        Err(e) => Err(e.into()),
    }
}

fn fetch_resolution(conn: &Connection, id: ResolutionId) -> Result<Resolution> {
    conn.query_row(
        &format!("SELECT {RESOLUTION_COLUMNS} FROM resolutions WHERE resolution_id = ?1"),
        params![id.0],
        row_to_resolution,
    )
    .map_err(not_found)
}

fn row_to_resolution(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resolution> {
    let proposer_str: String = row.get(2)?;
    let kind_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let respondent_str: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;
    let responded_str: Option<String> = row.get(7)?;

    Ok(Resolution {
        resolution_id: ResolutionId(row.get(0)?),
        issue_id: IssueId(row.get(1)?),
        proposer_id: codec::user_id(2, &proposer_str)?,
        kind: codec::variant(3, &kind_str)?,
        status: codec::variant(4, &status_str)?,
        respondent_id: respondent_str
            .map(|s| codec::user_id(5, &s))
            .transpose()?,
        created_at: codec::utc(6, &created_str)?,
        responded_at: responded_str.map(|s| codec::fixed(7, &s)).transpose()?,
    })
}
