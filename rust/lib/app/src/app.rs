use std::sync::Arc;

use rede_client::{ApiClient, SharedToken};
use rede_kv::KVStore;
use tracing::info;
use url::Url;

use crate::error::AppError;
use crate::notice::Notice;
use crate::reaction::ReactionSync;
use crate::screens::{
    Composer, Context, FeedScreen, NotificationsScreen, PostDetailScreen, ProfileScreen,
    StoriesScreen,
};
use crate::session::{Session, SessionStore};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One backend origin, one slot store, one session.
///
/// Screens handed out by the same `App` share reaction state, so a like
/// toggled on the feed shows on the post detail screen too.
pub struct App {
    ctx: Context,
}

impl App {
    pub fn open(server: &str, storage: Arc<dyn KVStore>) -> Result<Self, AppError> {
        Self::with_page_size(server, storage, DEFAULT_PAGE_SIZE)
    }

    /// Fails only when `server` is not an absolute http(s) URL.
    pub fn with_page_size(
        server: &str,
        storage: Arc<dyn KVStore>,
        page_size: u32,
    ) -> Result<Self, AppError> {
        let token = SharedToken::new();
        let client = Arc::new(ApiClient::new(server, Arc::new(token.clone()))?);
        let session = Arc::new(SessionStore::new(client.clone(), storage, token));
        let reactions = Arc::new(ReactionSync::new(client.clone()));
        info!(server = client.base_url(), page_size, "app ready");
        Ok(Self {
            ctx: Context {
                client,
                session,
                reactions,
                page_size: page_size.max(1),
            },
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.ctx.client
    }

    pub fn base_url(&self) -> &str {
        self.ctx.client.base_url()
    }

    pub fn origin(&self) -> &Url {
        self.ctx.client.origin()
    }

    /// Absolute URL for a media reference, see [`ApiClient::media_url`].
    pub fn media_url(&self, reference: &str) -> Option<String> {
        self.ctx.client.media_url(reference)
    }

    pub fn session(&self) -> &SessionStore<ApiClient> {
        &self.ctx.session
    }

    /// Reaction state shared by every screen of this app.
    pub fn reactions(&self) -> &ReactionSync<ApiClient> {
        &self.ctx.reactions
    }

    /// Restore the persisted session. Call once at start-up.
    pub async fn restore(&self) -> Option<Session> {
        self.ctx.session.restore().await
    }

    /// End the session and drop reaction state tied to it.
    pub fn sign_out(&self) {
        self.ctx.end_session();
    }

    /// Notice for a failure raised outside a screen.
    pub fn report(&self, err: AppError) -> Notice {
        self.ctx.notice(err)
    }

    pub fn feed(&self) -> FeedScreen {
        FeedScreen::new(self.ctx.clone())
    }

    pub fn post_detail(&self, post_id: u64) -> PostDetailScreen {
        PostDetailScreen::new(self.ctx.clone(), post_id)
    }

    pub fn notifications(&self) -> NotificationsScreen {
        NotificationsScreen::new(self.ctx.clone())
    }

    /// The signed-in user's profile.
    pub fn profile(&self) -> Result<ProfileScreen, AppError> {
        let identity = self.ctx.session.identity().ok_or(AppError::NotSignedIn)?;
        Ok(ProfileScreen::new(self.ctx.clone(), identity.id))
    }

    pub fn stories(&self) -> StoriesScreen {
        StoriesScreen::new(self.ctx.clone())
    }

    pub fn composer(&self) -> Composer {
        Composer::new(self.ctx.clone())
    }
}
