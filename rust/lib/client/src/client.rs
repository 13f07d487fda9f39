use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::media::{parse_origin, resolve_media};
use crate::model::*;
use crate::token::TokenSource;

// ── ApiClient ───────────────────────────────────────────────────────

/// Typed client for the Rede backend.
///
/// Every path is relative to one origin: `{base_url}/posts`,
/// `{base_url}/auth/me`, ... Authenticated calls attach
/// `Authorization: Bearer <token>` from the [`TokenSource`].
pub struct ApiClient {
    http: reqwest::Client,
    origin: Url,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl ApiClient {
    /// Fails with [`ApiError::InvalidUrl`] unless `base_url` is an absolute
    /// `http`/`https` URL.
    pub fn new(base_url: &str, token_source: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let origin = parse_origin(base_url)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: origin.as_str().trim_end_matches('/').to_string(),
            origin,
            token_source,
        })
    }

    /// The configured origin, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL for a media reference from one of this backend's records.
    pub fn media_url(&self, reference: &str) -> Option<String> {
        resolve_media(&self.origin, reference)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request with auth header.
    async fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Send a request and return the body of a 2xx response as text,
    /// mapping anything else to `ApiError::Status`.
    async fn send(builder: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            debug!("request failed with {}", status);
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }

    /// Send and decode a JSON body.
    async fn fetch<R: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<R, ApiError> {
        let body = Self::send(builder).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let req = self.authed(self.http.get(self.url(path))).await?;
        Self::fetch(req).await
    }

    async fn post_json<B: serde::Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let req = self.authed(self.http.post(self.url(path)).json(body)).await?;
        Self::fetch(req).await
    }

    // ── Auth ────────────────────────────────────────────────────────

    /// `POST /auth/login`. Anonymous.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        Self::fetch(self.http.post(self.url("/auth/login")).json(&body)).await
    }

    /// `POST /auth/register`. Anonymous.
    pub async fn register(&self, req: &RegisterRequest) -> Result<User, ApiError> {
        Self::fetch(self.http.post(self.url("/auth/register")).json(req)).await
    }

    /// `GET /auth/me` with an explicit credential, bypassing the token source.
    pub async fn me_with_token(&self, token: &str) -> Result<User, ApiError> {
        Self::fetch(self.http.get(self.url("/auth/me")).bearer_auth(token)).await
    }

    /// `GET /auth/me`.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get("/auth/me").await
    }

    /// `PUT /users/me`.
    pub async fn update_me(&self, changes: &ProfileUpdate) -> Result<User, ApiError> {
        let req = self.authed(self.http.put(self.url("/users/me")).json(changes)).await?;
        Self::fetch(req).await
    }

    // ── Posts ───────────────────────────────────────────────────────

    /// `GET /posts?page={page}&limit={limit}`. Pages are 1-based.
    pub async fn posts(&self, page: u32, limit: u32) -> Result<ListResponse<Post>, ApiError> {
        self.get(&format!("/posts?page={}&limit={}", page, limit)).await
    }

    /// `GET /posts/{id}`.
    pub async fn post(&self, id: u64) -> Result<Post, ApiError> {
        self.get(&format!("/posts/{}", id)).await
    }

    /// `POST /posts`.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, ApiError> {
        self.post_json("/posts", post).await
    }

    /// `GET /users/{id}/posts?page={page}&limit={limit}`.
    pub async fn user_posts(&self, user_id: u64, page: u32, limit: u32) -> Result<ListResponse<Post>, ApiError> {
        self.get(&format!("/users/{}/posts?page={}&limit={}", user_id, page, limit)).await
    }

    /// `GET /users/{id}/stats`.
    pub async fn user_stats(&self, user_id: u64) -> Result<UserStats, ApiError> {
        self.get(&format!("/users/{}/stats", user_id)).await
    }

    // ── Reactions ───────────────────────────────────────────────────

    /// `POST /posts/{id}/reactions` with `{"reaction_type": ...}`.
    pub async fn react(&self, post_id: u64, reaction_type: &str) -> Result<(), ApiError> {
        let body = ReactionRequest {
            reaction_type: reaction_type.to_string(),
        };
        let path = format!("/posts/{}/reactions", post_id);
        let req = self.authed(self.http.post(self.url(&path)).json(&body)).await?;
        Self::send(req).await.map(|_| ())
    }

    /// `DELETE /posts/{id}/reactions`, no body.
    pub async fn unreact(&self, post_id: u64) -> Result<(), ApiError> {
        let path = format!("/posts/{}/reactions", post_id);
        let req = self.authed(self.http.delete(self.url(&path))).await?;
        Self::send(req).await.map(|_| ())
    }

    // ── Comments ────────────────────────────────────────────────────

    /// `GET /posts/{id}/comments`.
    pub async fn comments(&self, post_id: u64) -> Result<ListResponse<Comment>, ApiError> {
        self.get(&format!("/posts/{}/comments", post_id)).await
    }

    /// `POST /posts/{id}/comments`.
    pub async fn add_comment(&self, post_id: u64, content: &str) -> Result<Comment, ApiError> {
        let body = NewComment {
            content: content.to_string(),
        };
        self.post_json(&format!("/posts/{}/comments", post_id), &body).await
    }

    // ── Stories ─────────────────────────────────────────────────────

    /// `GET /stories`: active stories, newest first.
    pub async fn stories(&self) -> Result<ListResponse<Story>, ApiError> {
        self.get("/stories").await
    }

    /// `POST /stories`.
    pub async fn create_story(&self, story: &NewStory) -> Result<Story, ApiError> {
        self.post_json("/stories", story).await
    }

    /// `POST /stories/{id}/view`.
    pub async fn view_story(&self, story_id: u64) -> Result<(), ApiError> {
        let path = format!("/stories/{}/view", story_id);
        let req = self.authed(self.http.post(self.url(&path))).await?;
        Self::send(req).await.map(|_| ())
    }

    // ── Notifications ───────────────────────────────────────────────

    /// `GET /notifications`.
    pub async fn notifications(&self) -> Result<ListResponse<Notification>, ApiError> {
        self.get("/notifications").await
    }

    /// `GET /notifications/unread-count`.
    pub async fn unread_notifications(&self) -> Result<u64, ApiError> {
        let count: UnreadCount = self.get("/notifications/unread-count").await?;
        Ok(count.count)
    }

    /// `PUT /notifications/{id}/read`.
    pub async fn mark_notification_read(&self, id: u64) -> Result<(), ApiError> {
        let path = format!("/notifications/{}/read", id);
        let req = self.authed(self.http.put(self.url(&path))).await?;
        Self::send(req).await.map(|_| ())
    }

    /// `PUT /notifications/mark-all-read`.
    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        let req = self
            .authed(self.http.put(self.url("/notifications/mark-all-read")))
            .await?;
        Self::send(req).await.map(|_| ())
    }

    // ── Media ───────────────────────────────────────────────────────

    /// `POST /upload/media` as multipart (`file` field). Returns the stored
    /// path, which callers resolve with [`ApiClient::media_url`].
    pub async fn upload_media(&self, file: &MediaFile) -> Result<UploadResponse, ApiError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)
            .map_err(|e| ApiError::Decode(format!("mime {}: {}", file.mime, e)))?;
        let form = Form::new().part("file", part);
        let req = self
            .authed(self.http.post(self.url("/upload/media")).multipart(form))
            .await?;
        Self::fetch(req).await
    }
}
