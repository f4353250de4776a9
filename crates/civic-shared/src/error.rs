use thiserror::Error;

/// A resolution event that the issue's current status does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Issue already has a pending resolution")]
    PendingExists,

    #[error("Issue is already resolved")]
    AlreadyResolved,

    #[error("Issue has no pending resolution to respond to")]
    NothingPending,
}

/// A persisted or wire string that does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
