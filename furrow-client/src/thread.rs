use crate::{
    api::{CommentId, CommentStore, PostId, Viewer, ViewerIdentity},
    CommentDb, CommentExt, Error, LikeAction, Node, NodeState, ReplyForm, ValidationError,
};

/// Everything needed to display and interact with the comments of one post
pub struct PostThread<S, V> {
    store: S,
    viewer: V,
    db: CommentDb,
}

impl<S: CommentStore, V: ViewerIdentity> PostThread<S, V> {
    /// Starts empty, call `refresh` to load the comments
    pub fn new(post_id: PostId, store: S, viewer: V) -> PostThread<S, V> {
        PostThread {
            store,
            viewer,
            db: CommentDb::new(post_id),
        }
    }

    pub fn db(&self) -> &CommentDb {
        &self.db
    }

    /// For driving a `ReplyForm` by hand, eg. to `cancel` an abandoned submission
    pub fn db_mut(&mut self) -> &mut CommentDb {
        &mut self.db
    }

    pub fn post_id(&self) -> &PostId {
        &self.db.post_id
    }

    pub fn viewer(&self) -> Option<Viewer> {
        self.viewer.current_viewer()
    }

    /// Refetches the whole collection from the store
    ///
    /// On failure the previously displayed comments stay as they were.
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let comments = self
            .store
            .fetch_comments(&self.db.post_id)
            .await
            .map_err(Error::FetchFailed)?;
        self.db.replace_fetched(comments)
    }

    pub fn tree(&self) -> Vec<Node> {
        self.db.tree()
    }

    pub fn node_state(&self, id: &CommentId) -> Option<NodeState> {
        let viewer = self.viewer.current_viewer_id();
        self.db.get(id).map(|c| c.node_state(viewer.as_ref()))
    }

    /// Form for replying to `parent`, or for a top-level comment if `None`
    pub fn reply_form(&self, parent: Option<&CommentId>) -> Result<ReplyForm, Error> {
        match parent {
            None => Ok(ReplyForm::top_level()),
            Some(id) => self
                .db
                .get(id)
                .map(|c| ReplyForm::reply_to(&c))
                .ok_or_else(|| Error::UnknownComment(id.clone())),
        }
    }

    /// Submits the form's content, displaying it immediately and reconciling
    /// with the server's answer
    pub async fn submit(&mut self, form: &mut ReplyForm) -> Result<CommentId, Error> {
        let viewer = self.viewer.current_viewer();
        let pending = form.begin(viewer.as_ref(), &mut self.db)?;
        let res = self
            .store
            .submit_comment(&pending.post_id, &pending.body)
            .await;
        form.finish(&mut self.db, pending, res)
    }

    /// Likes or unlikes `id` as the current viewer, rolling back the local
    /// change if the server refuses it
    pub async fn set_liked(&mut self, id: &CommentId, like: bool) -> Result<(), Error> {
        let viewer = self
            .viewer
            .current_viewer_id()
            .ok_or(ValidationError::NotLoggedIn)?;
        let comment = self
            .db
            .get(id)
            .ok_or_else(|| Error::UnknownComment(id.clone()))?;
        if comment.is_pending() {
            return Err(ValidationError::NotConfirmed.into());
        }
        let ticket = self.db.apply_like(id, viewer, like)?;
        let res = match like {
            true => self.store.like_comment(id).await,
            false => self.store.unlike_comment(id).await,
        };
        match res {
            Ok(record) => self.db.confirm_like(ticket, record),
            Err(source) => {
                self.db.rollback_like(ticket);
                let action = match like {
                    true => LikeAction::Like,
                    false => LikeAction::Unlike,
                };
                tracing::debug!(comment = %id, %action, err = %source, "rolled back like");
                Err(Error::ActionFailed {
                    action,
                    comment: id.clone(),
                    source,
                })
            }
        }
    }

    /// Flips the viewer's like on `id`, returning whether it is now liked
    pub async fn toggle_like(&mut self, id: &CommentId) -> Result<bool, Error> {
        let liked = self
            .node_state(id)
            .ok_or_else(|| Error::UnknownComment(id.clone()))?
            .liked_by_viewer;
        self.set_liked(id, !liked).await?;
        Ok(!liked)
    }
}
