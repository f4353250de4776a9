//! Client-facing views.
//!
//! Raw store records never leave the server.  Everything goes through the
//! views below, which apply the anonymity mask and the ownership flag and
//! attach reaction and comment aggregates.  An anonymous record carries
//! [`AuthorView::anonymous`] for every viewer, its own author included.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use civic_shared::{
    AuthorView, CategoryId, CommentId, IssueId, IssueStatus, ReactionSummary, ResolutionId,
    ResolutionKind, ResolutionStatus, Threaded, UserId,
};
use civic_store::{
    Category, CommentRecord, Database, Issue, IssueRecord, Location, Resolution, User,
};

use crate::error::ServerError;

/// The author block for `user`, or the sentinel when the content is
/// anonymous.
pub fn author_view(user: &User, is_anonymous: bool) -> AuthorView {
    if is_anonymous {
        return AuthorView::anonymous();
    }
    AuthorView {
        user_id: Some(user.user_id),
        email_address: Some(user.email_address.clone()),
        username: user.username.clone(),
        fullname: user.fullname.clone(),
        image_url: user.image_url.clone(),
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IssueView {
    pub issue_id: IssueId,
    pub category_id: CategoryId,
    pub category: Category,
    pub content: String,
    pub sentiment: String,
    pub is_anonymous: bool,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<FixedOffset>>,
    pub location: Option<Location>,
    pub user: AuthorView,
    pub is_owner: bool,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
    pub comment_count: i64,
}

/// Compose one issue view for `viewer`.
pub fn issue_view(
    db: &Database,
    record: IssueRecord,
    viewer: UserId,
) -> Result<IssueView, ServerError> {
    let IssueRecord {
        issue,
        author,
        category,
        location,
    } = record;

    let reactions = db.reaction_summary(issue.issue_id, Some(viewer))?;
    let comment_count = db.count_comments(issue.issue_id)?;

    Ok(IssueView {
        issue_id: issue.issue_id,
        category_id: issue.category_id,
        category,
        user: author_view(&author, issue.is_anonymous),
        is_owner: author.user_id == viewer,
        content: issue.content,
        sentiment: issue.sentiment,
        is_anonymous: issue.is_anonymous,
        status: issue.status,
        created_at: issue.created_at,
        resolved_at: issue.resolved_at,
        location,
        reactions,
        comment_count,
    })
}

pub fn issue_views(
    db: &Database,
    records: Vec<IssueRecord>,
    viewer: UserId,
) -> Result<Vec<IssueView>, ServerError> {
    records
        .into_iter()
        .map(|record| issue_view(db, record, viewer))
        .collect()
}

/// Fetch and compose a single issue.
pub fn load_issue_view(
    db: &Database,
    issue_id: IssueId,
    viewer: UserId,
) -> Result<IssueView, ServerError> {
    let record = db
        .get_issue_record(issue_id)
        .map_err(|e| ServerError::from_store("Issue", e))?;
    issue_view(db, record, viewer)
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub comment_id: CommentId,
    pub issue_id: IssueId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub user: AuthorView,
    pub is_owner: bool,
}

impl Threaded for CommentView {
    fn comment_id(&self) -> CommentId {
        self.comment_id
    }

    fn parent_id(&self) -> Option<CommentId> {
        self.parent_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub fn comment_view(record: CommentRecord, viewer: UserId) -> CommentView {
    let CommentRecord { comment, author } = record;
    CommentView {
        comment_id: comment.comment_id,
        issue_id: comment.issue_id,
        parent_id: comment.parent_id,
        user: author_view(&author, comment.is_anonymous),
        is_owner: author.user_id == viewer,
        content: comment.content,
        is_anonymous: comment.is_anonymous,
        created_at: comment.created_at,
    }
}

// ---------------------------------------------------------------------------
// Resolutions
// ---------------------------------------------------------------------------

/// A resolution as seen by `viewer`.  On an anonymous issue the author's
/// id is blanked wherever it appears.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionView {
    pub resolution_id: ResolutionId,
    pub issue_id: IssueId,
    pub kind: ResolutionKind,
    pub status: ResolutionStatus,
    pub proposer_id: Option<UserId>,
    pub respondent_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<FixedOffset>>,
    /// The viewer may accept or reject this proposal.
    pub can_respond: bool,
}

pub fn resolution_view(resolution: Resolution, issue: &Issue, viewer: UserId) -> ResolutionView {
    let mask = |id: UserId| (!(issue.is_anonymous && id == issue.user_id)).then_some(id);

    ResolutionView {
        resolution_id: resolution.resolution_id,
        issue_id: resolution.issue_id,
        kind: resolution.kind,
        status: resolution.status,
        proposer_id: mask(resolution.proposer_id),
        respondent_id: resolution.respondent_id.and_then(mask),
        created_at: resolution.created_at,
        responded_at: resolution.responded_at,
        can_respond: resolution.status == ResolutionStatus::Pending
            && resolution.respondent_id == Some(viewer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_store::{NewIssue, NewUser};

    fn setup() -> (Database, User, User, CategoryId) {
        let db = Database::open_in_memory().unwrap();
        let mk = |name: &str| {
            db.create_user(&NewUser {
                username: name.to_string(),
                fullname: format!("{name} Fullname"),
                email_address: format!("{name}@example.com"),
                image_url: Some(format!("https://img.example.com/{name}.png")),
            })
            .unwrap()
        };
        let alice = mk("alice");
        let bob = mk("bob");
        let roads = db.create_category("Roads").unwrap().category_id;
        (db, alice, bob, roads)
    }

    fn post(db: &Database, author: &User, category: CategoryId, anonymous: bool) -> IssueId {
        db.create_issue(&NewIssue {
            user_id: author.user_id,
            category_id: category,
            content: "Pothole on Main St".to_string(),
            sentiment: "Angry".to_string(),
            is_anonymous: anonymous,
            location: None,
        })
        .unwrap()
        .issue_id
    }

    #[test]
    fn test_anonymous_issue_masked_for_everyone() {
        let (db, alice, bob, roads) = setup();
        let id = post(&db, &alice, roads, true);

        let for_bob = load_issue_view(&db, id, bob.user_id).unwrap();
        assert_eq!(for_bob.user, AuthorView::anonymous());
        assert!(!for_bob.is_owner);

        let for_alice = load_issue_view(&db, id, alice.user_id).unwrap();
        assert_eq!(for_alice.user, AuthorView::anonymous());
        assert!(for_alice.is_owner);

        let json = serde_json::to_string(&for_alice).unwrap();
        assert!(!json.contains(&alice.user_id.to_string()));
        assert!(!json.contains("alice"));
    }

    #[test]
    fn test_named_issue_carries_author_and_aggregates() {
        let (db, alice, bob, roads) = setup();
        let id = post(&db, &alice, roads, false);
        db.set_reaction(id, bob.user_id, civic_shared::ReactionKind::Sad)
            .unwrap();

        let view = load_issue_view(&db, id, bob.user_id).unwrap();
        assert_eq!(view.user.user_id, Some(alice.user_id));
        assert_eq!(view.user.username, "alice");
        assert_eq!(view.reactions.user_reaction, Some(civic_shared::ReactionKind::Sad));
        assert_eq!(view.comment_count, 0);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["user_reaction"], "😢");
        assert_eq!(json["reactions"]["😢"], 1);
    }

    #[test]
    fn test_resolution_view_masks_anonymous_author() {
        let (db, alice, bob, roads) = setup();
        let id = post(&db, &alice, roads, true);
        let proposal = db.create_external_resolution(id, bob.user_id).unwrap();
        let issue = db.get_issue(id).unwrap();

        let for_alice = resolution_view(proposal.clone(), &issue, alice.user_id);
        assert_eq!(for_alice.proposer_id, Some(bob.user_id));
        assert_eq!(for_alice.respondent_id, None);
        assert!(for_alice.can_respond);

        let for_bob = resolution_view(proposal, &issue, bob.user_id);
        assert!(!for_bob.can_respond);
    }
}
