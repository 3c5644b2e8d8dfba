use crate::{
    api::{self, Comment, CommentId, NewComment, PostId, Viewer},
    CommentDb, Draft, Error, ValidationError,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyState {
    Idle,

    /// Waiting for the server, the optimistic comment has this temporary id
    Submitting(CommentId),
}

/// How the last submission from a form ended, for the view to display
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyOutcome {
    Confirmed(CommentId),
    Failed(String),
}

/// A submission that passed validation and is optimistically in the thread
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingReply {
    pub temp_id: CommentId,
    pub post_id: PostId,
    pub body: NewComment,
}

/// Form for a top-level comment or for a reply to one comment
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplyForm {
    pub parent_id: Option<CommentId>,
    pub text: String,
    pub is_open: bool,

    prefill: String,
    state: ReplyState,
    last_outcome: Option<ReplyOutcome>,
}

impl ReplyForm {
    pub fn top_level() -> ReplyForm {
        ReplyForm {
            parent_id: None,
            text: String::new(),
            is_open: true,
            prefill: String::new(),
            state: ReplyState::Idle,
            last_outcome: None,
        }
    }

    /// Starts closed, opening it mentions the parent's author
    pub fn reply_to(parent: &Comment) -> ReplyForm {
        ReplyForm {
            parent_id: Some(parent.id.clone()),
            text: String::new(),
            is_open: false,
            prefill: format!("@{} ", parent.author_name),
            state: ReplyState::Idle,
            last_outcome: None,
        }
    }

    pub fn toggle(&mut self) {
        match self.is_open {
            true => {
                self.is_open = false;
                self.text.clear();
            }
            false => {
                self.is_open = true;
                self.text = self.prefill.clone();
            }
        }
    }

    pub fn state(&self) -> &ReplyState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, ReplyState::Submitting(_))
    }

    pub fn last_outcome(&self) -> Option<&ReplyOutcome> {
        self.last_outcome.as_ref()
    }

    fn validate(&self, viewer: Option<&Viewer>) -> Result<Viewer, ValidationError> {
        if self.is_submitting() {
            return Err(ValidationError::SubmissionInFlight);
        }
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if api::validate_string(&self.text).is_err() {
            return Err(ValidationError::NullByte);
        }
        viewer.cloned().ok_or(ValidationError::NotLoggedIn)
    }

    /// Validates the form and inserts the optimistic comment into `db`
    ///
    /// On validation failure nothing changes and nothing must be sent.
    pub fn begin(
        &mut self,
        viewer: Option<&Viewer>,
        db: &mut CommentDb,
    ) -> Result<PendingReply, Error> {
        let viewer = self.validate(viewer)?;
        let body = NewComment {
            text: self.text.clone(),
            parent_id: self.parent_id.clone(),
        };
        let temp_id = db.insert_optimistic(Draft {
            post_id: db.post_id.clone(),
            text: body.text.clone(),
            parent_id: body.parent_id.clone(),
            author_id: viewer.id,
            author_name: viewer.name,
        })?;
        self.state = ReplyState::Submitting(temp_id.clone());
        self.last_outcome = None;
        Ok(PendingReply {
            temp_id,
            post_id: db.post_id.clone(),
            body,
        })
    }

    /// Gives up on a submission whose answer will never be read, removing
    /// its optimistic comment. The typed text is kept.
    pub fn cancel(&mut self, db: &mut CommentDb) {
        if let ReplyState::Submitting(temp) = std::mem::replace(&mut self.state, ReplyState::Idle) {
            db.rollback(&temp);
        }
    }

    /// Applies the server's answer to `pending`: confirmation swaps in the
    /// canonical comment and resets the form, failure rolls the optimistic
    /// comment back and keeps the typed text for a retry.
    pub fn finish(
        &mut self,
        db: &mut CommentDb,
        pending: PendingReply,
        result: Result<Comment, api::Error>,
    ) -> Result<CommentId, Error> {
        if self.state != ReplyState::Submitting(pending.temp_id.clone()) {
            tracing::warn!(temp = %pending.temp_id, state = ?self.state, "finishing submission the form was not waiting for");
        }
        self.state = ReplyState::Idle;
        let res = match result {
            Ok(c) => {
                let id = c.id.clone();
                db.confirm(&pending.temp_id, c).map(|()| id)
            }
            Err(e) => Err(Error::SubmissionFailed(e)),
        };
        match res {
            Ok(id) => {
                tracing::debug!(temp = %pending.temp_id, %id, "comment submission confirmed");
                self.text.clear();
                // The top-level form stays available for the next comment
                self.is_open = self.parent_id.is_none();
                self.last_outcome = Some(ReplyOutcome::Confirmed(id.clone()));
                Ok(id)
            }
            Err(e) => {
                tracing::debug!(temp = %pending.temp_id, err = %e, "comment submission failed");
                db.rollback(&pending.temp_id);
                self.last_outcome = Some(ReplyOutcome::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::api::UserId;

    fn parent() -> Comment {
        Comment {
            id: CommentId::from(1),
            post_id: PostId::from(1),
            parent_id: None,
            author_id: UserId::from(3),
            author_name: String::from("ada"),
            text: String::from("hi"),
            created_at: Utc::now(),
            liked_by: Default::default(),
        }
    }

    fn grace() -> Viewer {
        Viewer {
            id: UserId::from(4),
            name: String::from("grace"),
        }
    }

    fn db() -> CommentDb {
        let mut db = CommentDb::new(PostId::from(1));
        db.replace_fetched(vec![parent()]).unwrap();
        db
    }

    #[test]
    fn opening_reply_mentions_author() {
        let mut form = ReplyForm::reply_to(&parent());
        assert!(!form.is_open);
        form.toggle();
        assert!(form.is_open);
        assert_eq!(form.text, "@ada ");
        form.toggle();
        assert!(!form.is_open);
        assert_eq!(form.text, "");
    }

    #[test]
    fn validation_failures_touch_nothing() {
        let mut db = db();
        let before = db.clone();

        let mut form = ReplyForm::top_level();
        form.text = String::from("   ");
        assert_eq!(
            form.begin(Some(&grace()), &mut db),
            Err(Error::Validation(ValidationError::EmptyText))
        );

        form.text = String::from("hello");
        assert_eq!(
            form.begin(None, &mut db),
            Err(Error::Validation(ValidationError::NotLoggedIn))
        );

        form.text = String::from("hel\0lo");
        assert_eq!(
            form.begin(Some(&grace()), &mut db),
            Err(Error::Validation(ValidationError::NullByte))
        );

        assert_eq!(form.state(), &ReplyState::Idle);
        assert_eq!(db, before);
    }

    #[test]
    fn no_double_submit() {
        let mut db = db();
        let mut form = ReplyForm::reply_to(&parent());
        form.toggle();
        form.text.push_str("hello");
        let pending = form.begin(Some(&grace()), &mut db).unwrap();
        assert_eq!(form.state(), &ReplyState::Submitting(pending.temp_id.clone()));
        assert_eq!(
            form.begin(Some(&grace()), &mut db),
            Err(Error::Validation(ValidationError::SubmissionInFlight))
        );
        assert_eq!(db.comments().len(), 2);
    }

    #[test]
    fn cancelled_submission_is_rolled_back() {
        let mut db = db();
        let before = db.clone();
        let mut form = ReplyForm::top_level();
        form.text = String::from("hello");
        form.begin(Some(&grace()), &mut db).unwrap();
        form.cancel(&mut db);
        assert_eq!(db, before);
        assert_eq!(form.state(), &ReplyState::Idle);
        assert_eq!(form.text, "hello");
    }

    #[test]
    fn confirmed_reply_resets_form() {
        let mut db = db();
        let mut form = ReplyForm::reply_to(&parent());
        form.toggle();
        form.text.push_str("hello");
        let pending = form.begin(Some(&grace()), &mut db).unwrap();
        assert_eq!(pending.body.text, "@ada hello");
        assert_eq!(pending.body.parent_id, Some(CommentId::from(1)));

        let forest = db.tree();
        let optimistic = &forest[0].children[0].comment;
        assert_eq!(optimistic.author_name, "grace");

        let mut canonical = optimistic.clone();
        canonical.id = CommentId::from(42);
        let id = form.finish(&mut db, pending, Ok(canonical)).unwrap();
        assert_eq!(id, CommentId::from(42));
        assert_eq!(form.state(), &ReplyState::Idle);
        assert_eq!(form.text, "");
        assert!(!form.is_open);
        assert_eq!(form.last_outcome(), Some(&ReplyOutcome::Confirmed(id)));
        assert_eq!(db.tree()[0].children[0].comment.id, CommentId::from(42));
        assert_eq!(db.tree()[0].children[0].depth, 1);
    }

    #[test]
    fn failed_reply_keeps_draft() {
        let mut db = db();
        let before = db.comments();
        let mut form = ReplyForm::top_level();
        form.text = String::from("my long thoughts");
        let pending = form.begin(Some(&grace()), &mut db).unwrap();
        let err = form
            .finish(&mut db, pending, Err(api::Error::Unreachable(String::from("offline"))))
            .unwrap_err();
        assert_eq!(
            err,
            Error::SubmissionFailed(api::Error::Unreachable(String::from("offline")))
        );
        assert!(err.is_recoverable());
        assert_eq!(db.comments(), before);
        assert_eq!(form.state(), &ReplyState::Idle);
        assert_eq!(form.text, "my long thoughts");
        assert!(form.is_open);
        assert!(matches!(form.last_outcome(), Some(ReplyOutcome::Failed(_))));
    }
}
