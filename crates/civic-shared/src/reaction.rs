//! Reaction kinds.
//!
//! A user holds at most one reaction per issue; the kind is one of a fixed
//! set of emoji.  Kinds travel over the wire and sit in SQLite as the emoji
//! character itself.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReactionKind {
    #[serde(rename = "😠")]
    Angry,
    #[serde(rename = "😃")]
    Happy,
    #[serde(rename = "😢")]
    Sad,
    #[serde(rename = "😟")]
    Concerned,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::Angry,
        ReactionKind::Happy,
        ReactionKind::Sad,
        ReactionKind::Concerned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Angry => "😠",
            ReactionKind::Happy => "😃",
            ReactionKind::Sad => "😢",
            ReactionKind::Concerned => "😟",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::new("reaction kind", s))
    }
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate reaction state of one issue as seen by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    /// The caller's own reaction, if any.
    pub user_reaction: Option<ReactionKind>,
    /// Count per kind; kinds nobody used are absent.
    pub reactions: BTreeMap<ReactionKind, i64>,
}
