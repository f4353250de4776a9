use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ANONYMOUS_DISPLAY_NAME;

// User identity = account UUID issued at sign-up
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row identifiers are SQLite integer keys.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Identifier of a reported issue.
    IssueId
);
row_id!(
    /// Identifier of a comment on an issue.
    CommentId
);
row_id!(
    /// Identifier of a resolution proposal.
    ResolutionId
);
row_id!(CategoryId);
row_id!(LocationId);

/// Author block embedded in issue and comment views.
///
/// Anonymous content always carries [`AuthorView::anonymous`], whoever is
/// asking, so the true author never leaks through a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorView {
    pub user_id: Option<UserId>,
    pub email_address: Option<String>,
    pub username: String,
    pub fullname: String,
    pub image_url: Option<String>,
}

impl AuthorView {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            email_address: None,
            username: ANONYMOUS_DISPLAY_NAME.to_string(),
            fullname: ANONYMOUS_DISPLAY_NAME.to_string(),
            image_url: None,
        }
    }
}
