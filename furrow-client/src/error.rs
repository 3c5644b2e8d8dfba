use std::fmt;

use crate::api::{self, CommentId, PostId};

/// Reasons a submission is refused before anything is sent to the server
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("comment cannot be empty")]
    EmptyText,

    #[error("you must be logged in to do this")]
    NotLoggedIn,

    #[error("comment cannot contain null bytes")]
    NullByte,

    #[error("a submission from this form is already in flight")]
    SubmissionInFlight,

    #[error("this comment is still being submitted")]
    NotConfirmed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LikeAction {
    Like,
    Unlike,
}

impl fmt::Display for LikeAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LikeAction::Like => f.write_str("liking"),
            LikeAction::Unlike => f.write_str("unliking"),
        }
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed submitting comment: {0}")]
    SubmissionFailed(#[source] api::Error),

    #[error("failed {action} comment {comment}: {source}")]
    ActionFailed {
        action: LikeAction,
        comment: CommentId,
        #[source]
        source: api::Error,
    },

    #[error("failed fetching comments: {0}")]
    FetchFailed(#[source] api::Error),

    /// Callers must only hand over comments of the post being displayed
    #[error("comment {comment} belongs to post {found}, not to post {expected}")]
    ForeignComment {
        comment: CommentId,
        expected: PostId,
        found: PostId,
    },

    #[error("draft is for post {found}, not for post {expected}")]
    ForeignDraft { expected: PostId, found: PostId },

    #[error("comment {0} is not in the thread")]
    UnknownComment(CommentId),
}

impl Error {
    /// Whether retrying the same operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SubmissionFailed(_) | Error::ActionFailed { .. } | Error::FetchFailed(_)
        )
    }
}
