use rede_client::{ApiError, ErrorKind};
use rede_kv::KVError;
use thiserror::Error;

use crate::session::AuthError;

/// Failure of a screen-level operation.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] KVError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Rejected locally before any request was made.
    #[error("{0}")]
    Invalid(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("post {0} is not loaded")]
    NotLoaded(u64),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Api(e) => e.kind(),
            AppError::Storage(_) => ErrorKind::Server,
            AppError::Auth(e) => e.kind(),
            AppError::Invalid(_) => ErrorKind::Validation,
            AppError::NotSignedIn => ErrorKind::Authentication,
            AppError::NotLoaded(_) => ErrorKind::Validation,
        }
    }
}
