use std::sync::Mutex;

use rede_client::{Post, Story};
use serde::Serialize;
use tracing::{debug, warn};

use super::{lock, Context, LastNotice};
use crate::backend::FeedPages;
use crate::notice::Notice;
use crate::paging::{Cursor, LoadOutcome, PageLoader};
use crate::reaction::ReactionSnapshot;

/// Home feed: the stories bar plus the paginated post list.
pub struct FeedScreen {
    ctx: Context,
    posts: PageLoader<Post, FeedPages>,
    stories: Mutex<Vec<Story>>,
    notice: LastNotice,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedState {
    pub posts: Vec<Post>,
    pub stories: Vec<Story>,
    pub cursor: Cursor,
    pub notice: Option<Notice>,
}

impl FeedScreen {
    pub(crate) fn new(ctx: Context) -> Self {
        let posts = PageLoader::new(FeedPages(ctx.client.clone()), ctx.page_size);
        Self {
            ctx,
            posts,
            stories: Mutex::new(Vec::new()),
            notice: LastNotice::default(),
        }
    }

    /// Load page 1 and the stories bar together.
    ///
    /// A stories failure is logged and leaves the previous stories in
    /// place; only a posts failure produces a notice.
    pub async fn load(&self) -> Result<LoadOutcome, Notice> {
        let (posts, stories) = tokio::join!(self.posts.load_initial(), self.ctx.client.stories());

        match stories {
            Ok(page) => *lock(&self.stories) = page.items,
            Err(e) => warn!("stories unavailable: {}", e),
        }

        match posts {
            Ok(outcome) => {
                if let LoadOutcome::Loaded(_) = outcome {
                    self.ctx.reactions.seed_posts(&self.posts.items());
                }
                self.notice.clear();
                Ok(outcome)
            }
            Err(e) => Err(self.notice.record(self.ctx.notice(e))),
        }
    }

    pub async fn refresh(&self) -> Result<LoadOutcome, Notice> {
        self.load().await
    }

    /// Append the next page, if there is one.
    pub async fn load_more(&self) -> Result<LoadOutcome, Notice> {
        let before = self.posts.items().len();
        match self.posts.load_more().await {
            Ok(outcome) => {
                if let LoadOutcome::Loaded(n) = outcome {
                    debug!(n, "feed grew");
                    self.ctx.reactions.seed_posts(self.posts.items().iter().skip(before));
                }
                self.notice.clear();
                Ok(outcome)
            }
            Err(e) => Err(self.notice.record(self.ctx.notice(e))),
        }
    }

    /// Like or unlike a post in the feed.
    pub async fn toggle_like(&self, post_id: u64) -> Result<ReactionSnapshot, Notice> {
        self.ctx
            .reactions
            .toggle(post_id)
            .await
            .map_err(|e| self.notice.record(self.ctx.notice(e)))
    }

    /// Posts in server order, with the displayed like state applied.
    pub fn items(&self) -> Vec<Post> {
        let mut posts = self.posts.items();
        for post in &mut posts {
            self.ctx.reactions.overlay(post);
        }
        posts
    }

    pub fn stories(&self) -> Vec<Story> {
        lock(&self.stories).clone()
    }

    pub fn cursor(&self) -> Cursor {
        self.posts.cursor()
    }

    pub fn state(&self) -> FeedState {
        FeedState {
            posts: self.items(),
            stories: self.stories(),
            cursor: self.cursor(),
            notice: self.notice.get(),
        }
    }
}
