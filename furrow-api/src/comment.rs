use std::collections::BTreeSet;

use crate::{CommentId, Error, PostId, Time, UserId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,

    /// None for a top-level comment, ie. a direct child of the post
    #[serde(rename = "parent_comment_id", default)]
    pub parent_id: Option<CommentId>,

    #[serde(rename = "user_id")]
    pub author_id: UserId,
    #[serde(rename = "author_username", default)]
    pub author_name: String,

    #[serde(alias = "content")]
    pub text: String,

    #[serde(with = "crate::time_format")]
    pub created_at: Time,

    /// Set of users who liked this comment
    #[serde(rename = "likes", default)]
    pub liked_by: BTreeSet<UserId>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub text: String,
    #[serde(rename = "parent_comment_id")]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_comment_text(&self.text)
    }
}

/// Body of a successful comment creation. Depending on the backend version,
/// the comment is either returned as-is or wrapped with a status message.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum SubmitResponse {
    Envelope { comment: Comment },
    Bare(Comment),
}

impl SubmitResponse {
    pub fn into_comment(self) -> Comment {
        match self {
            SubmitResponse::Envelope { comment } => comment,
            SubmitResponse::Bare(comment) => comment,
        }
    }
}
