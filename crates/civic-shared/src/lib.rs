//! # civic-shared
//!
//! Types and pure logic shared by the store, the server and any client of the
//! civic issue platform: identifiers, limits, reaction kinds, the resolution
//! state machine and the comment thread reconstructor.

pub mod constants;
pub mod error;
pub mod reaction;
pub mod resolution;
pub mod thread;
pub mod types;

pub use error::{ParseError, TransitionError};
pub use reaction::{ReactionKind, ReactionSummary};
pub use resolution::{IssueStatus, ResolutionEvent, ResolutionKind, ResolutionStatus};
pub use thread::{CommentNode, Forest, Thread, Threaded};
pub use types::{AuthorView, CategoryId, CommentId, IssueId, LocationId, ResolutionId, UserId};
