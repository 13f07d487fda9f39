//! Seams between the sync core and the HTTP client.
//!
//! The session store, reaction driver and page loader talk to these traits;
//! [`ApiClient`] implements all of them, tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use rede_client::{
    ApiClient, ApiError, LoginResponse, Post, ProfileUpdate, RegisterRequest, User, REACTION_LIKE,
};

use crate::paging::PageSource;

/// Auth endpoints used by the session store.
#[async_trait]
pub trait AuthApi: Send + Sync + 'static {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    async fn register(&self, req: &RegisterRequest) -> Result<User, ApiError>;

    /// Resolve the identity behind a specific credential.
    async fn me(&self, token: &str) -> Result<User, ApiError>;

    async fn update_me(&self, changes: &ProfileUpdate) -> Result<User, ApiError>;
}

/// Network side of a reaction toggle.
#[async_trait]
pub trait ReactionApi: Send + Sync + 'static {
    async fn react(&self, post_id: u64) -> Result<(), ApiError>;

    async fn unreact(&self, post_id: u64) -> Result<(), ApiError>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        ApiClient::login(self, email, password).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<User, ApiError> {
        ApiClient::register(self, req).await
    }

    async fn me(&self, token: &str) -> Result<User, ApiError> {
        self.me_with_token(token).await
    }

    async fn update_me(&self, changes: &ProfileUpdate) -> Result<User, ApiError> {
        ApiClient::update_me(self, changes).await
    }
}

#[async_trait]
impl ReactionApi for ApiClient {
    async fn react(&self, post_id: u64) -> Result<(), ApiError> {
        ApiClient::react(self, post_id, REACTION_LIKE).await
    }

    async fn unreact(&self, post_id: u64) -> Result<(), ApiError> {
        ApiClient::unreact(self, post_id).await
    }
}

/// Home feed pages: `GET /posts`.
pub struct FeedPages(pub Arc<ApiClient>);

#[async_trait]
impl PageSource<Post> for FeedPages {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<Post>, ApiError> {
        Ok(self.0.posts(page, limit).await?.items)
    }
}

/// One user's posts: `GET /users/{id}/posts`.
pub struct UserPosts {
    pub client: Arc<ApiClient>,
    pub user_id: u64,
}

#[async_trait]
impl PageSource<Post> for UserPosts {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<Post>, ApiError> {
        Ok(self.client.user_posts(self.user_id, page, limit).await?.items)
    }
}
