//! Resolution workflow policy.
//!
//! The store enforces the state machine and the respondent rules inside its
//! transactions.  This layer adds what depends on configuration: the offset
//! resolution times are recorded at, and whether proposing an external
//! resolution requires having reported in the same category.

use chrono::FixedOffset;

use civic_shared::{CategoryId, IssueId, ResolutionId, UserId};
use civic_store::{Database, Resolution};

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Debug, Clone, Copy)]
pub struct Workflow {
    offset: FixedOffset,
    require_cluster_membership: bool,
}

impl Workflow {
    pub fn new(offset: FixedOffset, require_cluster_membership: bool) -> Self {
        Self {
            offset,
            require_cluster_membership,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.resolution_offset(), config.require_cluster_membership)
    }

    pub fn self_resolve(
        &self,
        db: &Database,
        issue_id: IssueId,
        user_id: UserId,
    ) -> Result<Resolution, ServerError> {
        db.create_self_resolution(issue_id, user_id, self.offset)
            .map_err(|e| ServerError::from_store("Issue", e))
    }

    pub fn propose_external(
        &self,
        db: &Database,
        issue_id: IssueId,
        proposer_id: UserId,
    ) -> Result<Resolution, ServerError> {
        let issue = db
            .get_issue(issue_id)
            .map_err(|e| ServerError::from_store("Issue", e))?;

        if issue.user_id == proposer_id {
            return Err(ServerError::Validation(
                "The author cannot propose an external resolution; use self-resolution".into(),
            ));
        }

        if self.require_cluster_membership
            && !has_user_issues_in_cluster(db, proposer_id, issue.category_id)
        {
            return Err(ServerError::Authorization(
                "Only users who reported an issue in this category can propose a resolution"
                    .into(),
            ));
        }

        db.create_external_resolution(issue_id, proposer_id)
            .map_err(|e| ServerError::from_store("Issue", e))
    }

    pub fn respond(
        &self,
        db: &Database,
        resolution_id: ResolutionId,
        user_id: UserId,
        accept: bool,
    ) -> Result<Resolution, ServerError> {
        db.respond_to_resolution(resolution_id, user_id, accept, self.offset)
            .map_err(|e| ServerError::from_store("Pending resolution", e))
    }
}

/// Whether `user_id` has reported anything in `category_id`.  A failed
/// lookup counts as "no".
pub fn has_user_issues_in_cluster(db: &Database, user_id: UserId, category_id: CategoryId) -> bool {
    match db.has_user_issues_in_category(user_id, category_id) {
        Ok(found) => found,
        Err(e) => {
            tracing::error!(
                error = %e,
                user = %user_id.short(),
                category = %category_id,
                "cluster membership lookup failed"
            );
            false
        }
    }
}
