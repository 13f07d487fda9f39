//! Signed-in identity and bearer credential.
//!
//! [`SessionStore`] is the single source of truth for "is a user logged
//! in". It persists two slots under the `session` scope (`token`, the raw
//! credential, and `identity`, the JSON identity record) and mirrors the
//! credential into the [`SharedToken`] the HTTP client reads from.

use std::sync::{Arc, PoisonError, RwLock};

use rede_client::{ApiError, ErrorKind, ProfileUpdate, RegisterRequest, SharedToken, User};
use rede_kv::{get_json, set_json, KVError, KVStore, Scoped};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::AuthApi;
use crate::error::AppError;

const SCOPE: &str = "session";
const TOKEN_SLOT: &str = "token";
const IDENTITY_SLOT: &str = "identity";

const MIN_PASSWORD_LEN: usize = 6;

// ── Types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.display_name(),
            email: user.email.clone().unwrap_or_default(),
            avatar: user.avatar.clone(),
            username: user.username.clone(),
            bio: user.bio.clone(),
        }
    }
}

impl Identity {
    /// Overwrite every field the patch sets.
    pub fn merge(&mut self, patch: IdentityPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if patch.avatar.is_some() {
            self.avatar = patch.avatar;
        }
        if patch.username.is_some() {
            self.username = patch.username;
        }
        if patch.bio.is_some() {
            self.bio = patch.bio;
        }
    }
}

/// Partial identity update. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
}

impl From<&User> for IdentityPatch {
    fn from(user: &User) -> Self {
        let id = Identity::from(user);
        Self {
            name: Some(id.name),
            email: user.email.clone(),
            avatar: id.avatar,
            username: id.username,
            bio: id.bio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
}

/// Registration input as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: Option<String>,
}

impl SignUpForm {
    /// Local checks run before anything is sent.
    pub fn validate(&self) -> Result<(), AuthError> {
        let invalid = |msg: &str| Err(AuthError::Invalid(msg.to_string()));
        if self.email.trim().is_empty() || self.password.is_empty() {
            return invalid("Please fill in all fields");
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return invalid("Please enter your first and last name");
        }
        if self.password != self.confirm_password {
            return invalid("Passwords do not match");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return invalid("Password must be at least 6 characters");
        }
        Ok(())
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            username: self
                .username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// Tagged failure of a session operation. Never a panic.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend refused the credentials or input; carries its message.
    #[error("{0}")]
    Rejected(String),

    #[error("connection error: {0}")]
    Connectivity(String),

    #[error("server error: {0}")]
    Server(String),

    /// Refused locally before any request.
    #[error("{0}")]
    Invalid(String),

    #[error("storage: {0}")]
    Storage(#[from] KVError),

    #[error("not signed in")]
    NotSignedIn,

    /// The stored credential stopped working; carries the server's text.
    #[error("session expired: {0}")]
    Expired(String),
}

/// For login and registration: a 401 there means wrong credentials.
impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        match e.kind() {
            ErrorKind::Connectivity => AuthError::Connectivity(e.to_string()),
            ErrorKind::Authentication | ErrorKind::Validation => AuthError::Rejected(
                e.server_message()
                    .unwrap_or_else(|| "Invalid email or password".to_string()),
            ),
            ErrorKind::Server => AuthError::Server(e.to_string()),
        }
    }
}

impl AuthError {
    /// Classify a failure of a call made with the session's credential,
    /// where a 401 means the session is over.
    fn signed_in(e: ApiError) -> Self {
        match e.kind() {
            ErrorKind::Authentication => {
                AuthError::Expired(e.server_message().unwrap_or_else(|| e.to_string()))
            }
            _ => AuthError::from(e),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Rejected(_) | AuthError::Invalid(_) => ErrorKind::Validation,
            AuthError::Connectivity(_) => ErrorKind::Connectivity,
            AuthError::Server(_) | AuthError::Storage(_) => ErrorKind::Server,
            AuthError::NotSignedIn | AuthError::Expired(_) => ErrorKind::Authentication,
        }
    }
}

// ── Store ───────────────────────────────────────────────────────────

pub struct SessionStore<A: AuthApi> {
    api: Arc<A>,
    slots: Scoped,
    token: SharedToken,
    current: RwLock<Option<Session>>,
}

impl<A: AuthApi> SessionStore<A> {
    /// `token` must be the cell the API client authenticates with.
    pub fn new(api: Arc<A>, storage: Arc<dyn KVStore>, token: SharedToken) -> Self {
        Self {
            api,
            slots: Scoped::new(storage, SCOPE),
            token,
            current: RwLock::new(None),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current().map(|s| s.identity)
    }

    pub fn is_signed_in(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn set_current(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Persist and install a freshly authenticated session.
    fn establish(&self, token: String, identity: Identity) -> Result<Session, AuthError> {
        self.slots.set(TOKEN_SLOT, token.as_bytes())?;
        set_json(&self.slots, IDENTITY_SLOT, &identity)?;
        self.token.set(token.clone());
        let session = Session { identity, token };
        self.set_current(Some(session.clone()));
        Ok(session)
    }

    /// `POST /auth/login`, then `GET /auth/me` with the new credential.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let login = self.api.login(email.trim(), password).await?;
        let user = self.api.me(&login.access_token).await?;
        let session = self.establish(login.access_token, Identity::from(&user))?;
        info!(user_id = session.identity.id, "signed in");
        Ok(session)
    }

    /// Register, then sign in with the same credentials.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Session, AuthError> {
        form.validate()?;
        let user = self.api.register(&form.to_request()).await?;
        debug!(user_id = user.id, "registered");
        self.sign_in(&form.email, &form.password).await
    }

    /// Forget the credential and identity. Safe to call when signed out.
    pub fn sign_out(&self) {
        for slot in [TOKEN_SLOT, IDENTITY_SLOT] {
            if let Err(e) = self.slots.delete(slot) {
                warn!(slot, "failed to clear session slot: {}", e);
            }
        }
        self.token.clear();
        if self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            info!("signed out");
        }
    }

    /// Bring back the persisted session, validating it with the backend.
    ///
    /// A rejected credential is cleared. An unreachable backend keeps the
    /// slots for the next run. Either way this run starts signed out and
    /// no error reaches the caller.
    pub async fn restore(&self) -> Option<Session> {
        let token = match self.slots.get(TOKEN_SLOT) {
            Ok(Some(bytes)) => String::from_utf8(bytes).ok(),
            Ok(None) => return None,
            Err(e) => {
                warn!("cannot read session slot: {}", e);
                return None;
            }
        };
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            self.sign_out();
            return None;
        };

        match self.api.me(&token).await {
            Ok(user) => match self.establish(token, Identity::from(&user)) {
                Ok(session) => {
                    debug!(user_id = session.identity.id, "session restored");
                    Some(session)
                }
                Err(e) => {
                    warn!("cannot persist restored session: {}", e);
                    None
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::Connectivity | ErrorKind::Server) => {
                info!("backend unavailable, keeping stored session: {}", e);
                None
            }
            Err(e) => {
                debug!("stored credential rejected: {}", e);
                self.sign_out();
                None
            }
        }
    }

    /// The identity last persisted, without contacting the backend.
    pub fn stored_identity(&self) -> Option<Identity> {
        match get_json(&self.slots, IDENTITY_SLOT) {
            Ok(identity) => identity,
            Err(e) => {
                warn!("cannot read identity slot: {}", e);
                None
            }
        }
    }

    /// Merge fields into the in-memory and persisted identity.
    pub fn update_identity(&self, patch: IdentityPatch) -> Result<Identity, AuthError> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let session = guard.as_mut().ok_or(AuthError::NotSignedIn)?;
        let mut identity = session.identity.clone();
        identity.merge(patch);
        set_json(&self.slots, IDENTITY_SLOT, &identity)?;
        session.identity = identity.clone();
        Ok(identity)
    }

    /// `PUT /users/me`, then adopt the server's record.
    pub async fn update_profile(&self, changes: &ProfileUpdate) -> Result<Identity, AuthError> {
        if !self.is_signed_in() {
            return Err(AuthError::NotSignedIn);
        }
        let user = self
            .api
            .update_me(changes)
            .await
            .map_err(AuthError::signed_in)?;
        self.update_identity(IdentityPatch::from(&user))
    }

    /// Sign out if `err` means the credential is no longer valid.
    /// Returns whether it did.
    pub fn on_error(&self, err: &AppError) -> bool {
        if err.kind() != ErrorKind::Authentication || !self.is_signed_in() {
            return false;
        }
        warn!("credential rejected, signing out: {}", err);
        self.sign_out();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rede_client::{ApiClient, LoginResponse, TokenSource};
    use rede_kv::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    const GOOD_TOKEN: &str = "tok-ana";

    /// Knows ana@example.com / secret1 plus whatever gets registered.
    #[derive(Default)]
    struct FakeAuth {
        registered: Mutex<Vec<RegisterRequest>>,
        offline: AtomicBool,
        unavailable: AtomicBool,
        revoked: AtomicBool,
    }

    fn ana() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "first_name": "Ana",
            "last_name": "Silva",
            "email": "ana@example.com",
            "username": "ana"
        }))
        .unwrap()
    }

    fn status(code: u16, detail: &str) -> ApiError {
        ApiError::Status {
            status: code,
            body: format!(r#"{{"detail":"{}"}}"#, detail),
        }
    }

    /// A real transport failure: a request to a port nobody listens on.
    async fn refused() -> ApiError {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = ApiClient::new(&format!("http://{}", addr), Arc::new(SharedToken::new())).unwrap();
        client.me().await.unwrap_err()
    }

    impl FakeAuth {
        async fn check_online(&self) -> Result<(), ApiError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(refused().await);
            }
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(status(503, "unavailable"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
            self.check_online().await?;
            let known = (email == "ana@example.com" && password == "secret1")
                || self
                    .registered
                    .lock()
                    .unwrap()
                    .iter()
                    .any(|r| r.email == email && r.password == password);
            if known {
                Ok(LoginResponse {
                    access_token: GOOD_TOKEN.into(),
                    token_type: "bearer".into(),
                })
            } else {
                Err(status(401, "Incorrect email or password"))
            }
        }

        async fn register(&self, req: &RegisterRequest) -> Result<User, ApiError> {
            self.check_online().await?;
            if req.email == "ana@example.com" {
                return Err(status(400, "Email already registered"));
            }
            self.registered.lock().unwrap().push(req.clone());
            Ok(ana())
        }

        async fn me(&self, token: &str) -> Result<User, ApiError> {
            self.check_online().await?;
            if token == GOOD_TOKEN {
                Ok(ana())
            } else {
                Err(status(401, "Could not validate credentials"))
            }
        }

        async fn update_me(&self, changes: &ProfileUpdate) -> Result<User, ApiError> {
            if self.revoked.load(Ordering::SeqCst) {
                return Err(status(401, "Could not validate credentials"));
            }
            let mut user = ana();
            if let Some(bio) = &changes.bio {
                user.bio = Some(bio.clone());
            }
            Ok(user)
        }
    }

    fn store() -> (SessionStore<FakeAuth>, Arc<MemoryStore>, SharedToken) {
        let mem = Arc::new(MemoryStore::new());
        let token = SharedToken::new();
        let store = SessionStore::new(Arc::new(FakeAuth::default()), mem.clone(), token.clone());
        (store, mem, token)
    }

    #[tokio::test]
    async fn sign_in_persists_both_slots() {
        let (store, mem, token) = store();
        let session = store.sign_in("ana@example.com", "secret1").await.unwrap();

        assert_eq!(session.identity.name, "Ana Silva");
        assert!(store.is_signed_in());
        assert_eq!(mem.get("session:token").unwrap().unwrap(), GOOD_TOKEN.as_bytes());
        let stored: Identity = get_json(mem.as_ref(), "session:identity").unwrap().unwrap();
        assert_eq!(stored.id, 7);
        assert_eq!(token.token().await.unwrap().as_deref(), Some(GOOD_TOKEN));
    }

    #[tokio::test]
    async fn wrong_password_surfaces_server_message() {
        let (store, mem, _) = store();
        let err = store.sign_in("ana@example.com", "nope").await.unwrap_err();

        match err {
            AuthError::Rejected(msg) => assert_eq!(msg, "Incorrect email or password"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!store.is_signed_in());
        assert!(mem.is_empty());
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let (store, mem, token) = store();
        store.sign_in("ana@example.com", "secret1").await.unwrap();

        store.sign_out();
        store.sign_out();
        assert!(!store.is_signed_in());
        assert!(mem.is_empty());
        assert_eq!(token.token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_with_valid_credential() {
        let (store, mem, _) = store();
        mem.set("session:token", GOOD_TOKEN.as_bytes()).unwrap();

        let session = store.restore().await.unwrap();
        assert_eq!(session.identity.username.as_deref(), Some("ana"));
        assert!(mem.get("session:identity").unwrap().is_some());
    }

    #[tokio::test]
    async fn restore_with_expired_credential_clears_slots() {
        let (store, mem, _) = store();
        mem.set("session:token", b"expired").unwrap();
        mem.set("session:identity", br#"{"id":7,"name":"Ana"}"#).unwrap();

        assert_eq!(store.restore().await, None);
        assert!(mem.is_empty());
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn restore_keeps_slots_when_backend_is_down() {
        let (store, mem, _) = store();
        mem.set("session:token", GOOD_TOKEN.as_bytes()).unwrap();
        mem.set("session:identity", br#"{"id":7,"name":"Ana Silva"}"#).unwrap();
        store.api.offline.store(true, Ordering::SeqCst);

        assert_eq!(store.restore().await, None);
        assert_eq!(mem.len(), 2);
        assert!(!store.is_signed_in());
        let last = store.stored_identity().unwrap();
        assert_eq!((last.id, last.name.as_str()), (7, "Ana Silva"));
    }

    #[tokio::test]
    async fn restore_keeps_slots_on_server_error() {
        let (store, mem, _) = store();
        mem.set("session:token", GOOD_TOKEN.as_bytes()).unwrap();
        store.api.unavailable.store(true, Ordering::SeqCst);

        assert_eq!(store.restore().await, None);
        assert_eq!(mem.len(), 1);
    }

    #[tokio::test]
    async fn sign_in_while_offline_is_connectivity() {
        let (store, mem, token) = store();
        store.api.offline.store(true, Ordering::SeqCst);

        let err = store.sign_in("ana@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::Connectivity(_)), "got {:?}", err);
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(!store.is_signed_in());
        assert!(mem.is_empty());
        assert_eq!(token.get(), None);
    }

    #[tokio::test]
    async fn restore_without_slots_is_none() {
        let (store, _, _) = store();
        assert_eq!(store.restore().await, None);
        assert_eq!(store.stored_identity(), None);
    }

    #[tokio::test]
    async fn sign_up_registers_then_signs_in() {
        let (store, _, _) = store();
        let form = SignUpForm {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "new@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            username: Some("  ".into()),
        };
        let session = store.sign_up(&form).await.unwrap();
        assert_eq!(session.token, GOOD_TOKEN);
        assert!(store.is_signed_in());

        let registered = store.api.registered.lock().unwrap().clone();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].username, None);
    }

    #[tokio::test]
    async fn sign_up_duplicate_email_is_rejected() {
        let (store, _, _) = store();
        let form = SignUpForm {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "ana@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            username: None,
        };
        match store.sign_up(&form).await.unwrap_err() {
            AuthError::Rejected(msg) => assert_eq!(msg, "Email already registered"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sign_up_form_validation() {
        let ok = SignUpForm {
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.c".into(),
            password: "123456".into(),
            confirm_password: "123456".into(),
            username: None,
        };
        assert!(ok.validate().is_ok());

        let mismatch = SignUpForm {
            confirm_password: "654321".into(),
            ..ok.clone()
        };
        assert!(matches!(mismatch.validate(), Err(AuthError::Invalid(m)) if m.contains("match")));

        let short = SignUpForm {
            password: "12345".into(),
            confirm_password: "12345".into(),
            ..ok.clone()
        };
        assert!(matches!(short.validate(), Err(AuthError::Invalid(m)) if m.contains("6")));

        let nameless = SignUpForm {
            last_name: " ".into(),
            ..ok
        };
        assert!(nameless.validate().is_err());
    }

    #[tokio::test]
    async fn update_identity_merges_and_persists() {
        let (store, mem, _) = store();
        assert!(matches!(
            store.update_identity(IdentityPatch::default()),
            Err(AuthError::NotSignedIn)
        ));

        store.sign_in("ana@example.com", "secret1").await.unwrap();
        let identity = store
            .update_identity(IdentityPatch {
                bio: Some("hello".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(identity.bio.as_deref(), Some("hello"));
        assert_eq!(identity.name, "Ana Silva");

        let stored: Identity = get_json(mem.as_ref(), "session:identity").unwrap().unwrap();
        assert_eq!(stored, identity);
    }

    #[tokio::test]
    async fn update_profile_adopts_server_record() {
        let (store, _, _) = store();
        store.sign_in("ana@example.com", "secret1").await.unwrap();
        let identity = store
            .update_profile(&ProfileUpdate {
                bio: Some("from server".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(identity.bio.as_deref(), Some("from server"));
        assert_eq!(store.identity().unwrap().bio.as_deref(), Some("from server"));
    }

    #[tokio::test]
    async fn authentication_error_forces_sign_out() {
        let (store, _, _) = store();
        store.sign_in("ana@example.com", "secret1").await.unwrap();

        assert!(!store.on_error(&AppError::Api(status(500, "boom"))));
        assert!(store.is_signed_in());

        assert!(store.on_error(&AppError::Api(status(401, "expired"))));
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn revoked_credential_on_profile_update_ends_session() {
        let (store, mem, _) = store();
        store.sign_in("ana@example.com", "secret1").await.unwrap();
        store.api.revoked.store(true, Ordering::SeqCst);

        let err = store
            .update_profile(&ProfileUpdate {
                bio: Some("too late".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(&err, AuthError::Expired(m) if m == "Could not validate credentials"));
        assert_eq!(err.kind(), ErrorKind::Authentication);

        assert!(store.on_error(&AppError::Auth(err)));
        assert!(!store.is_signed_in());
        assert!(mem.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_stays_a_validation_failure() {
        let (store, _, _) = store();
        store.sign_in("ana@example.com", "secret1").await.unwrap();
        let err = store.sign_in("ana@example.com", "nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!store.on_error(&AppError::Auth(err)));
        assert!(store.is_signed_in());
    }
}
