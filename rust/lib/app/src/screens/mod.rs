//! Screen controllers.
//!
//! Each controller owns the render-ready state of one screen and exposes
//! the operations its UI triggers. Operations never fail hard: errors come
//! back as a [`Notice`] and are also kept in the screen's state until the
//! next successful operation. An authentication failure anywhere signs the
//! session out.

mod compose;
mod feed;
mod notifications;
mod post_detail;
mod profile;
mod stories;

pub use compose::{Composer, PostDraft};
pub use feed::{FeedScreen, FeedState};
pub use notifications::{NotificationsScreen, NotificationsState};
pub use post_detail::{PostDetailScreen, PostDetailState};
pub use profile::{ProfileScreen, ProfileState};
pub use stories::{StoriesScreen, StoryDraft};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rede_client::{ApiClient, MediaFile, MediaKind};
use tracing::warn;

use crate::error::AppError;
use crate::notice::Notice;
use crate::reaction::ReactionSync;
use crate::session::SessionStore;

/// What every controller shares.
#[derive(Clone)]
pub(crate) struct Context {
    pub client: Arc<ApiClient>,
    pub session: Arc<SessionStore<ApiClient>>,
    pub reactions: Arc<ReactionSync<ApiClient>>,
    pub page_size: u32,
}

impl Context {
    /// Sign out and drop the reaction state of the old session.
    pub fn end_session(&self) {
        self.session.sign_out();
        self.reactions.clear();
    }

    /// Convert a failure into a notice, ending the session on a dead
    /// credential.
    pub fn notice(&self, err: AppError) -> Notice {
        if self.session.on_error(&err) {
            self.end_session();
            warn!("session ended by server");
        }
        let notice = Notice::from_error(&err);
        warn!(kind = ?notice.kind, "{}", err);
        notice
    }

    /// Upload a local file and return its stored path with the kind
    /// inferred from its MIME type.
    pub async fn upload(&self, file: &MediaFile) -> Result<(String, MediaKind), AppError> {
        let kind = MediaKind::from_mime(&file.mime)
            .ok_or_else(|| AppError::Invalid(format!("Unsupported media type: {}", file.mime)))?;
        let uploaded = self.client.upload_media(file).await?;
        Ok((uploaded.file_path, kind))
    }
}

/// The last notice a screen produced.
#[derive(Default)]
pub(crate) struct LastNotice(Mutex<Option<Notice>>);

impl LastNotice {
    fn lock(&self) -> MutexGuard<'_, Option<Notice>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> Option<Notice> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Record and hand back a notice.
    pub fn record(&self, notice: Notice) -> Notice {
        *self.lock() = Some(notice.clone());
        notice
    }
}

/// Poison-tolerant lock for screen state.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
