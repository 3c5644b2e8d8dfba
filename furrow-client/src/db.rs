use std::sync::Arc;

use chrono::Utc;

use crate::{
    api::{Comment, CommentId, PostId, UserId},
    build_tree, optimistic, Draft, Error, Node,
};

/// Handle on a like/unlike that was applied locally but not yet confirmed
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LikeTicket(u64);

#[derive(Clone, Debug, Eq, PartialEq)]
struct LikeDelta {
    ticket: LikeTicket,
    comment: CommentId,
    user: UserId,
    like: bool,
}

impl LikeDelta {
    fn apply_to(&self, c: &mut Comment) {
        match self.like {
            true => c.liked_by.insert(self.user.clone()),
            false => c.liked_by.remove(&self.user),
        };
    }
}

/// Comments of one post: the last state the server sent, overlaid with the
/// local changes that are still waiting for confirmation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentDb {
    pub post_id: PostId,

    /// Replaced wholesale on every fetch
    confirmed: Arc<Vec<Comment>>,

    /// Optimistic comments, all with temporary ids
    pending: Vec<Comment>,

    /// Optimistic likes and unlikes, in the order they were applied
    likes: Vec<LikeDelta>,

    next_ticket: u64,
}

impl CommentDb {
    pub fn new(post_id: PostId) -> CommentDb {
        CommentDb {
            post_id,
            confirmed: Arc::new(Vec::new()),
            pending: Vec::new(),
            likes: Vec::new(),
            next_ticket: 0,
        }
    }

    fn check_post(&self, c: &Comment) -> Result<(), Error> {
        match c.post_id == self.post_id {
            true => Ok(()),
            false => Err(Error::ForeignComment {
                comment: c.id.clone(),
                expected: self.post_id.clone(),
                found: c.post_id.clone(),
            }),
        }
    }

    /// Replaces the server state with a fresh fetch result. Optimistic
    /// comments and likes stay overlaid until confirmed or rolled back, even
    /// if the fetch does not include them yet.
    ///
    /// The whole collection is rejected, leaving `self` untouched, if any
    /// comment belongs to another post.
    pub fn replace_fetched(&mut self, comments: Vec<Comment>) -> Result<(), Error> {
        if let Some(c) = comments.iter().find(|c| c.post_id != self.post_id) {
            tracing::warn!(post = %self.post_id, comment = %c.id, "rejecting fetched comments that mix posts");
            self.check_post(c)?;
        }
        tracing::debug!(
            post = %self.post_id,
            num_comments = comments.len(),
            num_pending = self.pending.len(),
            num_pending_likes = self.likes.len(),
            "refreshed comment collection"
        );
        self.confirmed = Arc::new(comments);
        Ok(())
    }

    /// Adds `draft` as a comment created now, returning its temporary id
    pub fn insert_optimistic(&mut self, draft: Draft) -> Result<CommentId, Error> {
        if draft.post_id != self.post_id {
            return Err(Error::ForeignDraft {
                expected: self.post_id.clone(),
                found: draft.post_id,
            });
        }
        Ok(optimistic::insert_optimistic(
            &mut self.pending,
            draft,
            Utc::now(),
        ))
    }

    pub fn rollback(&mut self, temp: &CommentId) -> Option<Comment> {
        optimistic::remove_comment(&mut self.pending, temp)
    }

    /// Swaps the optimistic comment `temp` for the server's record
    pub fn confirm(&mut self, temp: &CommentId, canonical: Comment) -> Result<(), Error> {
        self.check_post(&canonical)?;
        if self.rollback(temp).is_none() {
            tracing::debug!(%temp, "confirming comment that was not pending");
        }
        self.upsert_confirmed(canonical);
        Ok(())
    }

    fn upsert_confirmed(&mut self, c: Comment) {
        let confirmed = Arc::make_mut(&mut self.confirmed);
        // A refetch may have been faster than the submission and already brought it in
        match confirmed.iter_mut().find(|old| old.id == c.id) {
            Some(old) => *old = c,
            None => confirmed.push(c),
        }
    }

    /// Locally (un)likes `comment` on behalf of `user`
    pub fn apply_like(
        &mut self,
        comment: &CommentId,
        user: UserId,
        like: bool,
    ) -> Result<LikeTicket, Error> {
        if self.get(comment).is_none() {
            return Err(Error::UnknownComment(comment.clone()));
        }
        let ticket = LikeTicket(self.next_ticket);
        self.next_ticket += 1;
        self.likes.push(LikeDelta {
            ticket,
            comment: comment.clone(),
            user,
            like,
        });
        Ok(ticket)
    }

    fn take_like(&mut self, ticket: LikeTicket) -> Option<LikeDelta> {
        let pos = self.likes.iter().position(|d| d.ticket == ticket)?;
        Some(self.likes.remove(pos))
    }

    /// Folds a successful like into the server state. `record` is the
    /// comment as returned by the server, if it returned one.
    pub fn confirm_like(
        &mut self,
        ticket: LikeTicket,
        record: Option<Comment>,
    ) -> Result<(), Error> {
        let delta = self.take_like(ticket);
        match (record, delta) {
            (Some(c), _) => {
                self.check_post(&c)?;
                self.upsert_confirmed(c);
            }
            (None, Some(delta)) => {
                let confirmed = Arc::make_mut(&mut self.confirmed);
                if let Some(c) = confirmed.iter_mut().find(|c| c.id == delta.comment) {
                    delta.apply_to(c);
                }
            }
            (None, None) => tracing::debug!(?ticket, "confirming unknown like ticket"),
        }
        Ok(())
    }

    /// Drops only this like's local effect
    pub fn rollback_like(&mut self, ticket: LikeTicket) {
        if self.take_like(ticket).is_none() {
            tracing::debug!(?ticket, "rolling back unknown like ticket");
        }
    }

    fn overlay_likes(&self, c: &mut Comment) {
        let id = c.id.clone();
        for d in self.likes.iter().filter(|d| d.comment == id) {
            d.apply_to(c);
        }
    }

    pub fn get(&self, id: &CommentId) -> Option<Comment> {
        let mut res = self
            .confirmed
            .iter()
            .chain(self.pending.iter())
            .find(|c| c.id == *id)
            .cloned()?;
        self.overlay_likes(&mut res);
        Some(res)
    }

    /// Flat collection as it should be displayed right now
    pub fn comments(&self) -> Vec<Comment> {
        let mut res = self
            .confirmed
            .iter()
            .chain(self.pending.iter())
            .cloned()
            .collect::<Vec<_>>();
        if !self.likes.is_empty() {
            for c in res.iter_mut() {
                self.overlay_likes(c);
            }
        }
        res
    }

    pub fn tree(&self) -> Vec<Node> {
        build_tree(&self.comments())
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len() + self.likes.len()
    }
}
