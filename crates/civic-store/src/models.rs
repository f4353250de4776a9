//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so the server can hand
//! it straight to a response when no masking is involved.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use civic_shared::{
    CategoryId, CommentId, IssueId, IssueStatus, LocationId, ResolutionId,
    ResolutionKind, ResolutionStatus, Threaded, UserId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub fullname: String,
    pub email_address: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub fullname: String,
    pub email_address: String,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Category / Location
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
}

/// A place an issue refers to.  `place_id` is the geocoder's identifier and
/// is what deduplicates locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub location_id: LocationId,
    pub place_id: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub suburb: Option<String>,
    pub district: Option<String>,
}

/// Location payload attached to a new issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLocation {
    pub place_id: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub suburb: Option<String>,
    pub district: Option<String>,
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// Raw issue row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub issue_id: IssueId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub content: String,
    pub sentiment: String,
    pub location_id: Option<LocationId>,
    pub is_anonymous: bool,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    /// Set exactly when `status` is [`IssueStatus::Resolved`].
    pub resolved_at: Option<DateTime<FixedOffset>>,
}

/// An issue joined with its author, category and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    pub issue: Issue,
    pub author: User,
    pub category: Category,
    pub location: Option<Location>,
}

/// Fields accepted when creating an issue.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub content: String,
    pub sentiment: String,
    pub is_anonymous: bool,
    pub location: Option<NewLocation>,
}

/// Author-editable fields.  `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct IssueChanges {
    pub category_id: Option<CategoryId>,
    pub content: Option<String>,
    pub sentiment: Option<String>,
    pub is_anonymous: Option<bool>,
}

impl IssueChanges {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.content.is_none()
            && self.sentiment.is_none()
            && self.is_anonymous.is_none()
    }
}

/// Paging and filtering for the issue feed.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub from: u32,
    pub amount: u32,
    /// Category name.
    pub category: Option<String>,
    /// Sentiment tag.
    pub mood: Option<String>,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A single comment.  `parent_id` is `None` for top-level comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub comment_id: CommentId,
    pub issue_id: IssueId,
    pub user_id: UserId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl Threaded for Comment {
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

/// A comment joined with its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author: User,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub issue_id: IssueId,
    pub user_id: UserId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub is_anonymous: bool,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A proposal that an issue be marked resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub resolution_id: ResolutionId,
    pub issue_id: IssueId,
    pub proposer_id: UserId,
    pub kind: ResolutionKind,
    pub status: ResolutionStatus,
    /// The user entitled to accept or reject.
    pub respondent_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<FixedOffset>>,
}
