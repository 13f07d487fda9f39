use rede_client::{MediaFile, NewPost, Post};
use tracing::info;

use super::{Context, LastNotice};
use crate::error::AppError;
use crate::notice::Notice;

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub content: String,
    pub media: Option<MediaFile>,
    pub privacy: String,
}

impl PostDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            media: None,
            privacy: "public".to_string(),
        }
    }

    pub fn with_media(mut self, media: MediaFile) -> Self {
        self.media = Some(media);
        self
    }
}

/// New-post screen.
pub struct Composer {
    ctx: Context,
    notice: LastNotice,
}

impl Composer {
    pub(crate) fn new(ctx: Context) -> Self {
        Self {
            ctx,
            notice: LastNotice::default(),
        }
    }

    /// Upload the draft's media, if any, then create the post.
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, Notice> {
        match self.submit(draft).await {
            Ok(post) => {
                info!(post_id = post.id, "post published");
                self.notice.clear();
                Ok(post)
            }
            Err(e) => Err(self.notice.record(self.ctx.notice(e))),
        }
    }

    async fn submit(&self, draft: PostDraft) -> Result<Post, AppError> {
        let content = draft.content.trim().to_string();
        if content.is_empty() && draft.media.is_none() {
            return Err(AppError::Invalid("Write something or attach media".into()));
        }
        let (media_url, media_type) = match &draft.media {
            Some(file) => {
                let (path, kind) = self.ctx.upload(file).await?;
                (Some(path), Some(kind.as_str().to_string()))
            }
            None => (None, None),
        };
        let post = NewPost {
            content,
            media_type,
            media_url,
            privacy: draft.privacy,
        };
        Ok(self.ctx.client.create_post(&post).await?)
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice.get()
    }
}
