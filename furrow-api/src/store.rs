use async_trait::async_trait;

use crate::{Comment, CommentId, Error, NewComment, PostId, UserId};

/// Remote source of truth for comments
#[async_trait]
pub trait CommentStore {
    /// Full flat, unordered collection of comments for `post`. Safe to call repeatedly.
    async fn fetch_comments(&mut self, post: &PostId) -> Result<Vec<Comment>, Error>;

    /// Returns the canonical record, including its permanent id
    async fn submit_comment(&mut self, post: &PostId, c: &NewComment) -> Result<Comment, Error>;

    /// Liking an already-liked comment is not an error
    async fn like_comment(&mut self, comment: &CommentId) -> Result<Option<Comment>, Error>;

    /// Unliking a not-liked comment is not an error
    async fn unlike_comment(&mut self, comment: &CommentId) -> Result<Option<Comment>, Error>;
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Viewer {
    pub id: UserId,
    pub name: String,
}

pub trait ViewerIdentity {
    /// None for an anonymous viewer
    fn current_viewer(&self) -> Option<Viewer>;

    fn current_viewer_id(&self) -> Option<UserId> {
        self.current_viewer().map(|v| v.id)
    }
}

impl ViewerIdentity for Option<Viewer> {
    fn current_viewer(&self) -> Option<Viewer> {
        self.clone()
    }
}

impl ViewerIdentity for Viewer {
    fn current_viewer(&self) -> Option<Viewer> {
        Some(self.clone())
    }
}
