use std::time::Duration;

use async_trait::async_trait;
use furrow_client::api::{
    self, Comment, CommentId, CommentStore, NewComment, PostId, SubmitResponse,
};
use reqwest::{RequestBuilder, Response, StatusCode};

/// `CommentStore` backed by the REST backend
pub struct HttpStore {
    client: reqwest::Client,
    host: String,
    token: Option<String>,
}

fn unreachable(e: reqwest::Error) -> api::Error {
    api::Error::Unreachable(e.to_string())
}

impl HttpStore {
    pub fn new(host: String, token: Option<String>, timeout: Duration) -> anyhow::Result<HttpStore> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpStore {
            client,
            host: host.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.host, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(tok) => req.bearer_auth(tok),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, api::Error> {
        let resp = self.authed(req).send().await.map_err(unreachable)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.bytes().await.map_err(unreachable)?;
        let err = api::Error::from_response(status, &body);
        tracing::debug!(%status, ?err, "backend refused request");
        Err(err)
    }

    async fn like_request(&self, req: RequestBuilder) -> Result<Option<Comment>, api::Error> {
        let resp = self.authed(req).send().await.map_err(unreachable)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(unreachable)?;
        like_answer(status, &body)
    }
}

/// Like/unlike answers carry the comment only on some backend versions.
/// The backend answers 409 when the comment already is in the requested
/// state, and 404 only when the comment does not exist.
fn like_answer(status: StatusCode, body: &[u8]) -> Result<Option<Comment>, api::Error> {
    match status {
        s if s.is_success() => Ok(serde_json::from_slice::<Comment>(body).ok()),
        StatusCode::CONFLICT => Ok(None),
        s => {
            let err = api::Error::from_response(s, body);
            tracing::debug!(status = %s, ?err, "backend refused like request");
            Err(err)
        }
    }
}

#[async_trait]
impl CommentStore for HttpStore {
    async fn fetch_comments(&mut self, post: &PostId) -> Result<Vec<Comment>, api::Error> {
        let req = self.client.get(self.url(&format!("posts/{post}/comments")));
        self.send(req)
            .await?
            .json()
            .await
            .map_err(|e| api::Error::Unknown(format!("parsing comments: {e}")))
    }

    async fn submit_comment(
        &mut self,
        post: &PostId,
        c: &NewComment,
    ) -> Result<Comment, api::Error> {
        let req = self
            .client
            .post(self.url(&format!("posts/{post}/comments")))
            .json(c);
        self.send(req)
            .await?
            .json::<SubmitResponse>()
            .await
            .map(SubmitResponse::into_comment)
            .map_err(|e| api::Error::Unknown(format!("parsing created comment: {e}")))
    }

    async fn like_comment(&mut self, comment: &CommentId) -> Result<Option<Comment>, api::Error> {
        let req = self.client.post(self.url(&format!("comments/{comment}/like")));
        self.like_request(req).await
    }

    async fn unlike_comment(&mut self, comment: &CommentId) -> Result<Option<Comment>, api::Error> {
        let req = self
            .client
            .delete(self.url(&format!("comments/{comment}/like")));
        self.like_request(req).await
    }
}
