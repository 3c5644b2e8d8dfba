use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use furrow_api::{
    Comment, CommentId, CommentStore, Error, NewComment, PostId, Time, UserId, Uuid, Viewer,
    ViewerIdentity,
};
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AuthToken(pub Uuid);

/// Kinds of requests whose failure can be injected
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    Fetch,
    Submit,
    Like,
    Unlike,
}

#[derive(Debug)]
struct Lag {
    remaining: usize,
    horizon: Time,
}

/// In-memory backend with the same observable behavior as the real one
#[derive(Debug)]
pub struct MockServer {
    users: BTreeMap<UserId, String>,
    sessions: HashMap<AuthToken, UserId>,
    posts: BTreeMap<PostId, UserId>,

    /// In creation order
    comments: Vec<Comment>,

    next_id: u64,
    clock: Time,
    failures: HashMap<Operation, usize>,
    lag: Option<Lag>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            sessions: HashMap::new(),
            posts: BTreeMap::new(),
            comments: Vec::new(),
            next_id: 1,
            clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            failures: HashMap::new(),
            lag: None,
        }
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn tick(&mut self) -> Time {
        self.clock = self.clock + Duration::seconds(1);
        self.clock
    }

    fn injected_failure(&mut self, op: Operation) -> Result<(), Error> {
        match self.failures.get_mut(&op) {
            Some(n) if *n > 0 => {
                *n -= 1;
                tracing::debug!(?op, remaining = *n, "injecting failure");
                Err(Error::Unreachable(String::from("injected failure")))
            }
            _ => Ok(()),
        }
    }

    pub fn create_user(&mut self, name: &str) -> UserId {
        let id = UserId::from(self.fresh_id());
        self.users.insert(id.clone(), String::from(name));
        id
    }

    pub fn auth(&mut self, user: UserId) -> Result<AuthToken, Error> {
        if !self.users.contains_key(&user) {
            return Err(Error::PermissionDenied);
        }
        let tok = AuthToken(Uuid::new_v4());
        self.sessions.insert(tok, user);
        Ok(tok)
    }

    fn resolve(&self, tok: AuthToken) -> Result<UserId, Error> {
        self.sessions
            .get(&tok)
            .cloned()
            .ok_or(Error::PermissionDenied)
    }

    pub fn whoami(&self, tok: AuthToken) -> Result<Viewer, Error> {
        let id = self.resolve(tok)?;
        let name = self.users.get(&id).cloned().unwrap_or_default();
        Ok(Viewer { id, name })
    }

    pub fn create_post(&mut self, owner: UserId) -> PostId {
        let id = PostId::from(self.fresh_id());
        self.posts.insert(id.clone(), owner);
        id
    }

    fn comment_mut(&mut self, id: &CommentId) -> Result<&mut Comment, Error> {
        self.comments
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| Error::NotFound(format!("comment {id}")))
    }

    /// Readable without a session
    pub fn fetch_comments(&mut self, post: &PostId) -> Result<Vec<Comment>, Error> {
        self.injected_failure(Operation::Fetch)?;
        if !self.posts.contains_key(post) {
            return Err(Error::NotFound(format!("post {post}")));
        }
        let horizon = match &mut self.lag {
            Some(lag) if lag.remaining > 0 => {
                lag.remaining -= 1;
                Some(lag.horizon)
            }
            _ => None,
        };
        Ok(self
            .comments
            .iter()
            .filter(|c| c.post_id == *post)
            .filter(|c| horizon.map(|h| c.created_at < h).unwrap_or(true))
            .cloned()
            .collect())
    }

    pub fn submit_comment(
        &mut self,
        tok: AuthToken,
        post: &PostId,
        c: &NewComment,
    ) -> Result<Comment, Error> {
        self.injected_failure(Operation::Submit)?;
        let author = self.resolve(tok)?;
        c.validate()?;
        if !self.posts.contains_key(post) {
            return Err(Error::NotFound(format!("post {post}")));
        }
        if let Some(parent) = &c.parent_id {
            if !self
                .comments
                .iter()
                .any(|p| p.id == *parent && p.post_id == *post)
            {
                return Err(Error::NotFound(format!("parent comment {parent}")));
            }
        }
        let comment = Comment {
            id: CommentId::from(self.fresh_id()),
            post_id: post.clone(),
            parent_id: c.parent_id.clone(),
            author_name: self.users.get(&author).cloned().unwrap_or_default(),
            author_id: author,
            text: c.text.clone(),
            created_at: self.tick(),
            liked_by: Default::default(),
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn like_comment(&mut self, tok: AuthToken, id: &CommentId) -> Result<Comment, Error> {
        self.injected_failure(Operation::Like)?;
        let user = self.resolve(tok)?;
        let c = self.comment_mut(id)?;
        if !c.liked_by.insert(user) {
            return Err(Error::Conflict(String::from("comment already liked")));
        }
        Ok(c.clone())
    }

    pub fn unlike_comment(&mut self, tok: AuthToken, id: &CommentId) -> Result<Comment, Error> {
        self.injected_failure(Operation::Unlike)?;
        let user = self.resolve(tok)?;
        let c = self.comment_mut(id)?;
        if !c.liked_by.remove(&user) {
            return Err(Error::Conflict(String::from("comment not liked by user")));
        }
        Ok(c.clone())
    }

    /// Makes the next `n` requests of kind `op` fail as if the network was down
    pub fn test_fail_next(&mut self, op: Operation, n: usize) {
        self.failures.insert(op, n);
    }

    /// The next `n` fetches miss `from` and every comment created after it
    pub fn test_lag_fetches(&mut self, from: &CommentId, n: usize) {
        self.lag = self
            .comments
            .iter()
            .find(|c| c.id == *from)
            .map(|c| Lag {
                remaining: n,
                horizon: c.created_at,
            });
    }

    /// Removes a comment without touching its replies, which become orphans
    pub fn test_delete_comment(&mut self, id: &CommentId) -> Option<Comment> {
        let pos = self.comments.iter().position(|c| c.id == *id)?;
        Some(self.comments.remove(pos))
    }

    pub fn test_num_comments(&self) -> usize {
        self.comments.len()
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

/// Client-side handle on a shared `MockServer`, logged in as `token` if any
#[derive(Clone, Debug)]
pub struct MockStore {
    server: Arc<Mutex<MockServer>>,
    token: Option<AuthToken>,
}

impl MockStore {
    pub fn new(server: Arc<Mutex<MockServer>>, token: Option<AuthToken>) -> MockStore {
        MockStore { server, token }
    }

    fn token(&self) -> Result<AuthToken, Error> {
        self.token.ok_or(Error::PermissionDenied)
    }
}

#[async_trait]
impl CommentStore for MockStore {
    async fn fetch_comments(&mut self, post: &PostId) -> Result<Vec<Comment>, Error> {
        self.server.lock().fetch_comments(post)
    }

    async fn submit_comment(&mut self, post: &PostId, c: &NewComment) -> Result<Comment, Error> {
        let tok = self.token()?;
        self.server.lock().submit_comment(tok, post, c)
    }

    async fn like_comment(&mut self, comment: &CommentId) -> Result<Option<Comment>, Error> {
        let tok = self.token()?;
        match self.server.lock().like_comment(tok, comment) {
            Ok(c) => Ok(Some(c)),
            Err(Error::Conflict(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn unlike_comment(&mut self, comment: &CommentId) -> Result<Option<Comment>, Error> {
        let tok = self.token()?;
        match self.server.lock().unlike_comment(tok, comment) {
            Ok(c) => Ok(Some(c)),
            Err(Error::Conflict(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl ViewerIdentity for MockStore {
    fn current_viewer(&self) -> Option<Viewer> {
        let tok = self.token?;
        self.server.lock().whoami(tok).ok()
    }
}
