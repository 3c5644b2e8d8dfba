mod comment;
pub use comment::{CommentExt, NodeState};

mod db;
pub use db::{CommentDb, LikeTicket};

mod error;
pub use error::{Error, LikeAction, ValidationError};

mod optimistic;
pub use optimistic::{insert_optimistic, remove_comment, replace_comment, Draft};

mod reply;
pub use reply::{PendingReply, ReplyForm, ReplyOutcome, ReplyState};

mod thread;
pub use thread::PostThread;

mod tree;
pub use tree::{build_tree, count, find, flatten, Node};

pub mod api {
    pub use furrow_api::*;
}

pub mod prelude {
    pub use crate::CommentExt;
}
