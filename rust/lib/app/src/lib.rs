//! Rede sync core.
//!
//! Everything a screen needs between the user and the backend:
//!
//! - [`session`]: who is signed in, persisted across runs
//! - [`reaction`]: optimistic like toggling with rollback and latest-wins
//! - [`paging`]: page-cursor list loading (initial, more, refresh)
//! - [`screens`]: per-screen controllers built from the above
//! - [`format`] / [`notice`]: display helpers
//!
//! [`App`] wires one backend origin, one slot store and one session
//! together and hands out screen controllers.

pub mod app;
pub mod backend;
pub mod error;
pub mod format;
pub mod notice;
pub mod paging;
pub mod reaction;
pub mod screens;
pub mod session;

pub use app::{App, DEFAULT_PAGE_SIZE};
pub use error::AppError;
pub use notice::Notice;
pub use paging::{Cursor, LoadOutcome, PageLoader, PageSource};
pub use reaction::{ReactionPhase, ReactionSnapshot, ReactionSync, ReactionToggle};
pub use session::{AuthError, Identity, IdentityPatch, Session, SessionStore, SignUpForm};
