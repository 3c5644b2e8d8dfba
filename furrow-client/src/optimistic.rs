use crate::api::{Comment, CommentId, PostId, Time, UserId};

/// A comment or reply the viewer is about to submit
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Draft {
    pub post_id: PostId,
    pub text: String,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub author_name: String,
}

impl Draft {
    pub fn into_comment(self, id: CommentId, created_at: Time) -> Comment {
        Comment {
            id,
            post_id: self.post_id,
            parent_id: self.parent_id,
            author_id: self.author_id,
            author_name: self.author_name,
            text: self.text,
            created_at,
            liked_by: Default::default(),
        }
    }
}

/// Appends `draft` to `comments` under a fresh temporary id, which is returned
///
/// Position in the flat list is irrelevant, `build_tree` places the comment
/// according to `now`.
pub fn insert_optimistic(comments: &mut Vec<Comment>, draft: Draft, now: Time) -> CommentId {
    let id = CommentId::temporary();
    comments.push(draft.into_comment(id.clone(), now));
    id
}

/// Rollback of an optimistic insertion
pub fn remove_comment(comments: &mut Vec<Comment>, id: &CommentId) -> Option<Comment> {
    let pos = comments.iter().position(|c| c.id == *id)?;
    Some(comments.remove(pos))
}

/// Swaps the entry `id` for `canonical`, returning false if `id` was not there
pub fn replace_comment(comments: &mut [Comment], id: &CommentId, canonical: Comment) -> bool {
    match comments.iter_mut().find(|c| c.id == *id) {
        Some(c) => {
            *c = canonical;
            true
        }
        None => false,
    }
}
