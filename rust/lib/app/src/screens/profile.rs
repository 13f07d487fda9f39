use std::sync::Mutex;

use rede_client::{Post, ProfileUpdate, UserStats};
use serde::Serialize;
use tracing::warn;

use super::{lock, Context, LastNotice};
use crate::backend::UserPosts;
use crate::error::AppError;
use crate::notice::Notice;
use crate::paging::{Cursor, LoadOutcome, PageLoader};
use crate::reaction::ReactionSnapshot;
use crate::session::Identity;

/// The signed-in user's own profile: identity, counters and posts.
pub struct ProfileScreen {
    ctx: Context,
    user_id: u64,
    posts: PageLoader<Post, UserPosts>,
    stats: Mutex<Option<UserStats>>,
    notice: LastNotice,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileState {
    pub identity: Option<Identity>,
    pub stats: Option<UserStats>,
    pub posts: Vec<Post>,
    pub cursor: Cursor,
    pub notice: Option<Notice>,
}

impl ProfileScreen {
    pub(crate) fn new(ctx: Context, user_id: u64) -> Self {
        let source = UserPosts {
            client: ctx.client.clone(),
            user_id,
        };
        let posts = PageLoader::new(source, ctx.page_size);
        Self {
            ctx,
            user_id,
            posts,
            stats: Mutex::new(None),
            notice: LastNotice::default(),
        }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Fetch the first page of posts and the counters together. Missing
    /// counters are logged; the posts decide success.
    pub async fn load(&self) -> Result<LoadOutcome, Notice> {
        let (posts, stats) = tokio::join!(
            self.posts.load_initial(),
            self.ctx.client.user_stats(self.user_id)
        );

        match stats {
            Ok(stats) => *lock(&self.stats) = Some(stats),
            Err(e) => warn!(user_id = self.user_id, "stats unavailable: {}", e),
        }

        match posts {
            Ok(outcome) => {
                if let LoadOutcome::Loaded(_) = outcome {
                    self.ctx.reactions.seed_posts(&self.posts.items());
                }
                self.notice.clear();
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn load_more(&self) -> Result<LoadOutcome, Notice> {
        let before = self.posts.items().len();
        match self.posts.load_more().await {
            Ok(outcome) => {
                if let LoadOutcome::Loaded(_) = outcome {
                    self.ctx.reactions.seed_posts(self.posts.items().iter().skip(before));
                }
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn toggle_like(&self, post_id: u64) -> Result<ReactionSnapshot, Notice> {
        self.ctx.reactions.toggle(post_id).await.map_err(|e| self.fail(e))
    }

    /// Save profile edits and adopt the server's record in the session.
    pub async fn update(&self, changes: &ProfileUpdate) -> Result<Identity, Notice> {
        self.ctx
            .session
            .update_profile(changes)
            .await
            .map_err(|e| self.fail(e.into()))
    }

    pub fn identity(&self) -> Option<Identity> {
        self.ctx.session.identity()
    }

    pub fn stats(&self) -> Option<UserStats> {
        *lock(&self.stats)
    }

    pub fn posts(&self) -> Vec<Post> {
        let mut posts = self.posts.items();
        for post in &mut posts {
            self.ctx.reactions.overlay(post);
        }
        posts
    }

    pub fn state(&self) -> ProfileState {
        ProfileState {
            identity: self.identity(),
            stats: self.stats(),
            posts: self.posts(),
            cursor: self.posts.cursor(),
            notice: self.notice.get(),
        }
    }

    fn fail(&self, err: AppError) -> Notice {
        self.notice.record(self.ctx.notice(err))
    }
}
