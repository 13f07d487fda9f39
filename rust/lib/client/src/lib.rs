//! Rede HTTP client.
//!
//! One [`ApiClient`] talks to one backend origin. Every request carries the
//! bearer credential supplied by a pluggable [`TokenSource`]; the session
//! layer installs a [`SharedToken`] and swaps its value on sign-in/out.
//!
//! # Usage
//!
//! ```ignore
//! use rede_client::{ApiClient, SharedToken};
//!
//! let token = SharedToken::new();
//! let client = ApiClient::new("http://localhost:8000", Arc::new(token.clone()))?;
//! token.set("jwt...");
//! let page = client.posts(1, 10).await?;
//! ```

pub mod client;
pub mod error;
pub mod media;
pub mod model;
pub mod token;

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind};
pub use media::{parse_origin, resolve_media};
pub use model::*;
pub use token::{SharedToken, TokenSource};
