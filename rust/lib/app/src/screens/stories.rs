use std::sync::Mutex;

use rede_client::{MediaFile, NewStory, Story};
use tracing::{debug, warn};

use super::{lock, Context, LastNotice};
use crate::error::AppError;
use crate::notice::Notice;

const DEFAULT_DURATION_HOURS: u32 = 24;

/// A story being composed.
#[derive(Debug, Clone)]
pub struct StoryDraft {
    pub content: String,
    pub media: Option<MediaFile>,
    pub background_color: Option<String>,
    pub duration_hours: u32,
    pub privacy: String,
}

impl Default for StoryDraft {
    fn default() -> Self {
        Self {
            content: String::new(),
            media: None,
            background_color: None,
            duration_hours: DEFAULT_DURATION_HOURS,
            privacy: "public".to_string(),
        }
    }
}

pub struct StoriesScreen {
    ctx: Context,
    stories: Mutex<Vec<Story>>,
    notice: LastNotice,
}

impl StoriesScreen {
    pub(crate) fn new(ctx: Context) -> Self {
        Self {
            ctx,
            stories: Mutex::new(Vec::new()),
            notice: LastNotice::default(),
        }
    }

    pub async fn load(&self) -> Result<usize, Notice> {
        match self.ctx.client.stories().await {
            Ok(page) => {
                let n = page.items.len();
                *lock(&self.stories) = page.items;
                self.notice.clear();
                Ok(n)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Record a view. Failures are only logged.
    pub async fn view(&self, story_id: u64) {
        match self.ctx.client.view_story(story_id).await {
            Ok(()) => debug!(story_id, "story viewed"),
            Err(e) => warn!(story_id, "recording story view failed: {}", e),
        }
    }

    /// Publish a story, uploading its media first. The new story goes to
    /// the front of the list.
    pub async fn create(&self, draft: StoryDraft) -> Result<Story, Notice> {
        match self.publish(draft).await {
            Ok(story) => {
                lock(&self.stories).insert(0, story.clone());
                self.notice.clear();
                Ok(story)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn publish(&self, draft: StoryDraft) -> Result<Story, AppError> {
        if draft.content.trim().is_empty() && draft.media.is_none() {
            return Err(AppError::Invalid("Add some text or media to your story".into()));
        }
        let (media_url, media_type) = match &draft.media {
            Some(file) => {
                let (path, kind) = self.ctx.upload(file).await?;
                (Some(path), kind.as_str().to_string())
            }
            None => (None, "text".to_string()),
        };
        let story = NewStory {
            content: draft.content,
            media_type,
            media_url,
            duration_hours: draft.duration_hours,
            background_color: draft.background_color,
            privacy: draft.privacy,
        };
        Ok(self.ctx.client.create_story(&story).await?)
    }

    pub fn stories(&self) -> Vec<Story> {
        lock(&self.stories).clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice.get()
    }

    fn fail(&self, err: AppError) -> Notice {
        self.notice.record(self.ctx.notice(err))
    }
}
