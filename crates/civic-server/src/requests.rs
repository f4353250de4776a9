//! Request bodies and their validation.
//!
//! Every check here runs before the store is touched, so a refused request
//! never leaves a partial write behind.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use civic_shared::constants::{MAX_COMMENT_CONTENT_CHARS, MAX_ISSUE_CONTENT_CHARS};
use civic_shared::{CategoryId, CommentId, IssueId, ReactionKind, ResolutionId, UserId};
use civic_store::{IssueChanges, IssueFilter, NewLocation};

use crate::error::ServerError;

/// `axum::Json` with rejections folded into [`ServerError::Validation`].
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ServerError {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    ServerError::Validation(rejection.body_text())
}

fn check_content(content: &str, limit: usize, what: &str) -> Result<(), ServerError> {
    if content.trim().is_empty() {
        return Err(ServerError::Validation(format!("{what} content must not be empty")));
    }
    if content.chars().count() > limit {
        return Err(ServerError::PayloadTooLarge(format!(
            "{what} content exceeds the maximum length of {limit} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    pub from: u32,
    pub amount: u32,
    pub category: Option<String>,
    pub mood: Option<String>,
}

impl FeedRequest {
    pub fn into_filter(self, max_page_size: u32) -> IssueFilter {
        IssueFilter {
            from: self.from,
            amount: self.amount.min(max_page_size),
            category: self.category.filter(|c| !c.is_empty()),
            mood: self.mood.filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueRef {
    pub issue_id: IssueId,
}

/// An issue plus the acting user, for author-only actions.
#[derive(Debug, Deserialize)]
pub struct IssueAction {
    pub issue_id: IssueId,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub profile_user_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationData {
    pub place_id: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub suburb: Option<String>,
    pub district: Option<String>,
}

impl LocationData {
    /// `None` when there is no place id to key the location on.
    pub fn into_new_location(self) -> Option<NewLocation> {
        let place_id = self.place_id.filter(|p| !p.is_empty())?;
        Some(NewLocation {
            place_id,
            province: self.province,
            city: self.city,
            suburb: self.suburb,
            district: self.district,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    pub user_id: Option<UserId>,
    pub category_id: Option<CategoryId>,
    pub content: Option<String>,
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub is_anonymous: bool,
    pub location_data: Option<LocationData>,
}

impl CreateIssueRequest {
    /// Required fields, in the order they are checked.
    pub fn validate(&self) -> Result<(CategoryId, &str), ServerError> {
        let (Some(category_id), Some(content)) = (self.category_id, self.content.as_deref())
        else {
            return Err(ServerError::Validation(
                "Missing required fields for creating an issue".into(),
            ));
        };
        check_content(content, MAX_ISSUE_CONTENT_CHARS, "Issue")?;
        Ok((category_id, content))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateIssueRequest {
    pub issue_id: IssueId,
    pub user_id: Option<UserId>,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sentiment: Option<String>,
    pub is_anonymous: Option<bool>,
    pub created_at: Option<serde_json::Value>,
    pub resolved_at: Option<serde_json::Value>,
}

impl UpdateIssueRequest {
    pub fn validate(&self) -> Result<IssueChanges, ServerError> {
        if self.created_at.is_some() || self.resolved_at.is_some() {
            return Err(ServerError::Validation(
                "Cannot change the time an issue was created or resolved".into(),
            ));
        }
        if let Some(content) = &self.content {
            check_content(content, MAX_ISSUE_CONTENT_CHARS, "Issue")?;
        }
        Ok(IssueChanges {
            category_id: self.category_id,
            content: self.content.clone(),
            sentiment: self.sentiment.clone(),
            is_anonymous: self.is_anonymous,
        })
    }
}

// ---------------------------------------------------------------------------
// Resolutions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub resolution_id: ResolutionId,
    pub user_id: Option<UserId>,
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClusterRequest {
    pub user_id: Option<UserId>,
    pub category_id: CategoryId,
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub issue_id: IssueId,
    pub user_id: Option<UserId>,
    #[serde(alias = "emoji")]
    pub kind: ReactionKind,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub issue_id: IssueId,
    pub user_id: Option<UserId>,
    pub parent_id: Option<CommentId>,
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<(), ServerError> {
        check_content(&self.content, MAX_COMMENT_CONTENT_CHARS, "Comment")
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentRequest {
    pub comment_id: CommentId,
    pub user_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(content: Option<&str>) -> CreateIssueRequest {
        CreateIssueRequest {
            user_id: None,
            category_id: Some(CategoryId(1)),
            content: content.map(str::to_string),
            sentiment: "Angry".into(),
            is_anonymous: false,
            location_data: None,
        }
    }

    #[test]
    fn test_issue_content_limits() {
        assert!(create(Some(&"a".repeat(500))).validate().is_ok());
        assert!(matches!(
            create(Some(&"a".repeat(501))).validate(),
            Err(ServerError::PayloadTooLarge(_))
        ));
        // Characters, not bytes.
        assert!(create(Some(&"é".repeat(500))).validate().is_ok());
        assert!(matches!(create(None).validate(), Err(ServerError::Validation(_))));
        assert!(matches!(create(Some("  ")).validate(), Err(ServerError::Validation(_))));
    }

    #[test]
    fn test_update_rejects_timestamps() {
        let req: UpdateIssueRequest = serde_json::from_value(serde_json::json!({
            "issue_id": 1,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(ServerError::Validation(_))));

        let req: UpdateIssueRequest = serde_json::from_value(serde_json::json!({
            "issue_id": 1,
            "content": "better wording"
        }))
        .unwrap();
        let changes = req.validate().unwrap();
        assert_eq!(changes.content.as_deref(), Some("better wording"));
        assert!(changes.category_id.is_none());
    }

    #[test]
    fn test_feed_amount_is_capped() {
        let req = FeedRequest {
            from: 0,
            amount: 5000,
            category: Some(String::new()),
            mood: None,
        };
        let filter = req.into_filter(100);
        assert_eq!(filter.amount, 100);
        assert!(filter.category.is_none());
    }

    #[test]
    fn test_location_needs_place_id() {
        assert!(LocationData::default().into_new_location().is_none());
        let loc = LocationData {
            place_id: Some("abc".into()),
            city: Some("Pretoria".into()),
            ..Default::default()
        }
        .into_new_location()
        .unwrap();
        assert_eq!(loc.place_id, "abc");
    }

    #[test]
    fn test_reaction_accepts_emoji_alias() {
        let req: ReactionRequest = serde_json::from_value(serde_json::json!({
            "issue_id": 3,
            "emoji": "😃"
        }))
        .unwrap();
        assert_eq!(req.kind, ReactionKind::Happy);
    }
}
