use crate::api::{Comment, CommentId, Time, UserId};

/// What a viewer may see and do on a single comment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeState {
    pub like_count: usize,
    pub liked_by_viewer: bool,
    pub can_reply: bool,
    pub can_like: bool,
}

pub trait CommentExt {
    /// Sibling order: creation time, then id
    fn thread_key(&self) -> (Time, &CommentId);

    /// Recomputed from the comment on every call, never cached
    fn node_state(&self, viewer: Option<&UserId>) -> NodeState;

    /// True until the server confirmed this comment
    fn is_pending(&self) -> bool;
}

impl CommentExt for Comment {
    fn thread_key(&self) -> (Time, &CommentId) {
        (self.created_at, &self.id)
    }

    fn node_state(&self, viewer: Option<&UserId>) -> NodeState {
        NodeState {
            like_count: self.liked_by.len(),
            liked_by_viewer: viewer.map(|v| self.liked_by.contains(v)).unwrap_or(false),
            can_reply: viewer.is_some(),
            can_like: viewer.is_some(),
        }
    }

    fn is_pending(&self) -> bool {
        self.id.is_temporary()
    }
}
