use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use furrow_api::{Comment, CommentId, PostId, UserId};
use rand::{seq::SliceRandom, Rng};

const AUTHORS: &[&str] = &["ada", "grace", "barbara", "edsger", "donald", "frances"];
const COMMENT_WORD_COUNT: usize = 25;

/// Prints a JSON array of comments that can be fed to `furrow-ctl render`
#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(long, default_value = "3")]
    posts: u64,

    /// Per post
    #[structopt(long, default_value = "40")]
    comments: usize,

    /// Probability for a comment to answer an earlier one instead of being top-level
    #[structopt(long, default_value = "0.6")]
    reply_share: f64,

    /// Probability for a reply to point to a comment that does not exist
    #[structopt(long, default_value = "0.05")]
    orphan_share: f64,
}

fn main() -> anyhow::Result<()> {
    let opt = <Opt as structopt::StructOpt>::from_args();
    anyhow::ensure!(
        (0.0..=1.0).contains(&opt.reply_share) && (0.0..=1.0).contains(&opt.orphan_share),
        "shares must be between 0 and 1"
    );

    let mut rng = rand::thread_rng();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let mut next_id = 1u64;
    let mut comments = Vec::new();

    for post in 1..=opt.posts {
        let mut post_comments: Vec<Comment> = Vec::with_capacity(opt.comments);
        let mut now = start;
        for _ in 0..opt.comments {
            now = now + Duration::seconds(rng.gen_range(1..3600));
            let parent_id = match rng.gen_bool(opt.reply_share) {
                false => None,
                true if rng.gen_bool(opt.orphan_share) => {
                    Some(CommentId::from(format!("deleted-{}", rng.gen::<u32>())))
                }
                true => post_comments.choose(&mut rng).map(|p| p.id.clone()),
            };
            let author = rng.gen_range(0..AUTHORS.len());
            let liked_by = (0..AUTHORS.len())
                .filter(|_| rng.gen_bool(0.3))
                .map(|u| UserId::from(u as u64 + 1))
                .collect();
            post_comments.push(Comment {
                id: CommentId::from(next_id),
                post_id: PostId::from(post),
                parent_id,
                author_id: UserId::from(author as u64 + 1),
                author_name: String::from(AUTHORS[author]),
                text: lipsum::lipsum_words(COMMENT_WORD_COUNT),
                created_at: now,
                liked_by,
            });
            next_id += 1;
        }
        comments.extend(post_comments);
    }

    // The backend returns comments in no particular order
    comments.shuffle(&mut rng);
    let out = serde_json::to_string_pretty(&comments).context("serializing comments")?;
    println!("{out}");
    Ok(())
}
