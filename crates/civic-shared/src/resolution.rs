//! Resolution workflow state machine.
//!
//! ```text
//! Open            --propose(self)-->     PendingSelf --(auto-accept)--> Resolved
//! Open            --propose(external)--> PendingExternal
//! PendingExternal --accept-->            Resolved
//! PendingExternal --reject-->            Rejected
//! Rejected        --propose(...)-->      PendingSelf | PendingExternal
//! ```
//!
//! [`IssueStatus`] is the authoritative state of an issue and is persisted
//! next to the issue row.  `PendingSelf` only exists for the instant between
//! a self proposal and its automatic acceptance; it is never stored.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, TransitionError};

/// Who proposed a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    /// Proposed by the issue's author; accepted on the spot.
    #[serde(rename = "self")]
    SelfResolution,
    /// Proposed by another user; waits for the author's answer.
    External,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::SelfResolution => "self",
            ResolutionKind::External => "external",
        }
    }
}

impl FromStr for ResolutionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(ResolutionKind::SelfResolution),
            "external" => Ok(ResolutionKind::External),
            other => Err(ParseError::new("resolution kind", other)),
        }
    }
}

/// Status of a single resolution proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Pending => "pending",
            ResolutionStatus::Accepted => "accepted",
            ResolutionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ResolutionStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResolutionStatus::Pending),
            "accepted" => Ok(ResolutionStatus::Accepted),
            "rejected" => Ok(ResolutionStatus::Rejected),
            other => Err(ParseError::new("resolution status", other)),
        }
    }
}

/// Something that happens to an issue's resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionEvent {
    Propose(ResolutionKind),
    Accept,
    Reject,
}

/// Resolution state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    PendingSelf,
    PendingExternal,
    Resolved,
    Rejected,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 5] = [
        IssueStatus::Open,
        IssueStatus::PendingSelf,
        IssueStatus::PendingExternal,
        IssueStatus::Resolved,
        IssueStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::PendingSelf => "pending_self",
            IssueStatus::PendingExternal => "pending_external",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Rejected => "rejected",
        }
    }

    /// `true` while a proposal awaits an answer.
    pub fn is_pending(&self) -> bool {
        matches!(self, IssueStatus::PendingSelf | IssueStatus::PendingExternal)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, IssueStatus::Resolved)
    }

    /// Apply one event, returning the next state.
    pub fn transition(self, event: ResolutionEvent) -> Result<IssueStatus, TransitionError> {
        use IssueStatus::*;
        use ResolutionEvent::*;

        match (self, event) {
            (Open | Rejected, Propose(ResolutionKind::SelfResolution)) => Ok(PendingSelf),
            (Open | Rejected, Propose(ResolutionKind::External)) => Ok(PendingExternal),
            (PendingSelf | PendingExternal, Propose(_)) => Err(TransitionError::PendingExists),
            (Resolved, Propose(_)) => Err(TransitionError::AlreadyResolved),

            (PendingSelf | PendingExternal, Accept) => Ok(Resolved),
            (PendingExternal, Reject) => Ok(Rejected),
            // A self proposal cannot be turned down by its own author.
            (PendingSelf, Reject) => Err(TransitionError::NothingPending),
            (Open | Rejected | Resolved, Accept | Reject) => Err(TransitionError::NothingPending),
        }
    }

    /// Propose and immediately accept a self resolution.
    pub fn self_resolve(self) -> Result<IssueStatus, TransitionError> {
        self.transition(ResolutionEvent::Propose(ResolutionKind::SelfResolution))?
            .transition(ResolutionEvent::Accept)
    }
}

impl FromStr for IssueStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseError::new("issue status", s))
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTERNAL: ResolutionEvent = ResolutionEvent::Propose(ResolutionKind::External);

    #[test]
    fn test_self_resolution_is_auto_accepted() {
        assert_eq!(IssueStatus::Open.self_resolve(), Ok(IssueStatus::Resolved));
        assert_eq!(IssueStatus::Rejected.self_resolve(), Ok(IssueStatus::Resolved));
    }

    #[test]
    fn test_external_reject_then_repropose() {
        let pending = IssueStatus::Open.transition(EXTERNAL).unwrap();
        assert_eq!(pending, IssueStatus::PendingExternal);

        let rejected = pending.transition(ResolutionEvent::Reject).unwrap();
        assert_eq!(rejected, IssueStatus::Rejected);
        assert!(!rejected.is_resolved());

        assert_eq!(rejected.transition(EXTERNAL), Ok(IssueStatus::PendingExternal));
    }

    #[test]
    fn test_pending_blocks_new_proposals() {
        assert_eq!(
            IssueStatus::PendingExternal.self_resolve(),
            Err(TransitionError::PendingExists)
        );
        assert_eq!(
            IssueStatus::PendingExternal.transition(EXTERNAL),
            Err(TransitionError::PendingExists)
        );
    }

    #[test]
    fn test_resolved_is_terminal() {
        assert_eq!(
            IssueStatus::Resolved.transition(EXTERNAL),
            Err(TransitionError::AlreadyResolved)
        );
        assert_eq!(
            IssueStatus::Resolved.transition(ResolutionEvent::Accept),
            Err(TransitionError::NothingPending)
        );
    }

    #[test]
    fn test_answers_require_a_pending_proposal() {
        for status in [IssueStatus::Open, IssueStatus::Rejected] {
            assert_eq!(
                status.transition(ResolutionEvent::Accept),
                Err(TransitionError::NothingPending)
            );
            assert_eq!(
                status.transition(ResolutionEvent::Reject),
                Err(TransitionError::NothingPending)
            );
        }
    }

    #[test]
    fn test_status_strings() {
        for status in IssueStatus::ALL {
            assert_eq!(status.as_str().parse::<IssueStatus>().unwrap(), status);
        }
        assert_eq!("self".parse::<ResolutionKind>().unwrap(), ResolutionKind::SelfResolution);
        assert_eq!(
            serde_json::to_string(&ResolutionKind::SelfResolution).unwrap(),
            "\"self\""
        );
        assert!("done".parse::<ResolutionStatus>().is_err());
    }
}
