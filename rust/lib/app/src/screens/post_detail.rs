use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rede_client::{Comment, Post};
use serde::Serialize;
use tracing::debug;

use super::{lock, Context, LastNotice};
use crate::error::AppError;
use crate::notice::Notice;
use crate::reaction::ReactionSnapshot;

/// One post with its comment thread.
pub struct PostDetailScreen {
    ctx: Context,
    post_id: u64,
    post: Mutex<Option<Post>>,
    comments: Mutex<Vec<Comment>>,
    sending: AtomicBool,
    notice: LastNotice,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailState {
    pub post: Option<Post>,
    pub comments: Vec<Comment>,
    pub sending: bool,
    pub notice: Option<Notice>,
}

impl PostDetailScreen {
    pub(crate) fn new(ctx: Context, post_id: u64) -> Self {
        Self {
            ctx,
            post_id,
            post: Mutex::new(None),
            comments: Mutex::new(Vec::new()),
            sending: AtomicBool::new(false),
            notice: LastNotice::default(),
        }
    }

    pub fn post_id(&self) -> u64 {
        self.post_id
    }

    /// Fetch the post and its comments.
    pub async fn load(&self) -> Result<(), Notice> {
        let client = &self.ctx.client;
        let (post, comments) = tokio::join!(client.post(self.post_id), client.comments(self.post_id));
        let loaded = post.and_then(|p| comments.map(|c| (p, c.items)));

        match loaded {
            Ok((post, comments)) => {
                self.ctx.reactions.seed(post.id, ReactionSnapshot::of(&post));
                *lock(&self.post) = Some(post);
                *lock(&self.comments) = comments;
                self.notice.clear();
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub async fn toggle_like(&self) -> Result<ReactionSnapshot, Notice> {
        self.ctx
            .reactions
            .toggle(self.post_id)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Post a comment. Blank text, or a send while another is running,
    /// does nothing and returns `Ok(None)`.
    pub async fn send_comment(&self, text: &str) -> Result<Option<Comment>, Notice> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            debug!(post_id = self.post_id, "comment already sending");
            return Ok(None);
        }

        let result = self.ctx.client.add_comment(self.post_id, text).await;
        self.sending.store(false, Ordering::SeqCst);

        match result {
            Ok(comment) => {
                lock(&self.comments).push(comment.clone());
                if let Some(post) = lock(&self.post).as_mut() {
                    post.comments_count += 1;
                }
                self.notice.clear();
                Ok(Some(comment))
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// The post with the displayed like state applied.
    pub fn post(&self) -> Option<Post> {
        let mut post = lock(&self.post).clone()?;
        self.ctx.reactions.overlay(&mut post);
        Some(post)
    }

    pub fn comments(&self) -> Vec<Comment> {
        lock(&self.comments).clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PostDetailState {
        PostDetailState {
            post: self.post(),
            comments: self.comments(),
            sending: self.is_sending(),
            notice: self.notice.get(),
        }
    }

    fn fail(&self, err: AppError) -> Notice {
        self.notice.record(self.ctx.notice(err))
    }
}
