use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use furrow_client::{
    api::{Comment, CommentId, CommentStore, PostId, UserId, Viewer},
    build_tree, PostThread,
};

mod http;
mod render;

use http::HttpStore;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(long, env = "FURROW_HOST", default_value = "http://localhost:5000")]
    host: String,

    /// Id of the user the token belongs to, used to display like state
    #[structopt(long, env = "FURROW_VIEWER")]
    viewer: Option<String>,

    /// Display name of the viewer, used for comments not confirmed yet
    #[structopt(long, env = "FURROW_VIEWER_NAME")]
    viewer_name: Option<String>,

    #[structopt(long, default_value = "10")]
    timeout_secs: u64,

    /// Replies deeper than this are displayed at this indentation
    #[structopt(long, default_value = "8")]
    max_indent: usize,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Display the comment thread of a post
    Show { post: String },

    /// Comment on a post
    Comment {
        post: String,

        text: String,

        /// Comment to reply to, the new comment is top-level if absent
        #[structopt(long)]
        reply_to: Option<String>,
    },

    Like { comment: String },

    Unlike { comment: String },

    /// Like the comment if the viewer did not already, unlike it otherwise
    ToggleLike { post: String, comment: String },

    /// Display a thread from a JSON dump of comments
    Render {
        file: PathBuf,

        /// Only display the comments of this post
        #[structopt(long)]
        post: Option<String>,
    },
}

impl Opt {
    fn viewer(&self) -> Option<Viewer> {
        self.viewer.as_ref().map(|id| Viewer {
            id: UserId::from(id.as_str()),
            name: self.viewer_name.clone().unwrap_or_default(),
        })
    }

    fn store(&self) -> anyhow::Result<HttpStore> {
        // Absent token means browsing anonymously
        let token = std::env::var("FURROW_TOKEN").ok();
        HttpStore::new(
            self.host.clone(),
            token,
            Duration::from_secs(self.timeout_secs),
        )
    }

    async fn thread(&self, post: &str) -> anyhow::Result<PostThread<HttpStore, Option<Viewer>>> {
        let mut thread = PostThread::new(PostId::from(post), self.store()?, self.viewer());
        thread
            .refresh()
            .await
            .with_context(|| format!("loading comments of post {post}"))?;
        Ok(thread)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let viewer = opt.viewer();
    let viewer_id = viewer.as_ref().map(|v| &v.id);

    match &opt.cmd {
        Command::Show { post } => {
            let thread = opt.thread(post).await?;
            print!(
                "{}",
                render::render(&thread.tree(), viewer_id, opt.max_indent)
            );
        }
        Command::Comment {
            post,
            text,
            reply_to,
        } => {
            let mut thread = opt.thread(post).await?;
            let mut form = thread.reply_form(reply_to.clone().map(CommentId::from).as_ref())?;
            form.text = text.clone();
            let id = thread.submit(&mut form).await?;
            println!("{id}");
        }
        Command::Like { comment } => {
            opt.store()?
                .like_comment(&CommentId::from(comment.as_str()))
                .await
                .with_context(|| format!("liking comment {comment}"))?;
        }
        Command::Unlike { comment } => {
            opt.store()?
                .unlike_comment(&CommentId::from(comment.as_str()))
                .await
                .with_context(|| format!("unliking comment {comment}"))?;
        }
        Command::ToggleLike { post, comment } => {
            let mut thread = opt.thread(post).await?;
            let liked = thread.toggle_like(&CommentId::from(comment.as_str())).await?;
            println!("{}", if liked { "liked" } else { "unliked" });
        }
        Command::Render { file, post } => {
            let dump = std::fs::read(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut comments: Vec<Comment> = serde_json::from_slice(&dump)
                .with_context(|| format!("parsing comments from {}", file.display()))?;
            if let Some(post) = post {
                let post = PostId::from(post.as_str());
                comments.retain(|c| c.post_id == post);
            }
            tracing::debug!(num_comments = comments.len(), "rendering dump");
            print!(
                "{}",
                render::render(&build_tree(&comments), viewer_id, opt.max_indent)
            );
        }
    }

    Ok(())
}
