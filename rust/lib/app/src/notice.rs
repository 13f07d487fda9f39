use std::fmt;

use rede_client::ErrorKind;
use serde::Serialize;

use crate::error::AppError;

/// A non-fatal, user-facing message for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    #[serde(skip)]
    pub kind: ErrorKind,
    pub message: String,
    /// Whether offering "try again" makes sense.
    pub retry: bool,
}

impl Notice {
    pub fn from_error(err: &AppError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Connectivity => "Connection error. Check your internet and try again.".to_string(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".to_string(),
            ErrorKind::Validation => validation_message(err),
            ErrorKind::Server => "Something went wrong. Please try again.".to_string(),
        };
        Self {
            kind,
            message,
            retry: matches!(kind, ErrorKind::Connectivity | ErrorKind::Server),
        }
    }
}

fn validation_message(err: &AppError) -> String {
    match err {
        AppError::Api(e) => e.server_message().unwrap_or_else(|| e.to_string()),
        other => other.to_string(),
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Notice::from_error(err)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthError;
    use rede_client::ApiError;

    fn status(code: u16, body: &str) -> AppError {
        AppError::Api(ApiError::Status {
            status: code,
            body: body.to_string(),
        })
    }

    #[test]
    fn validation_shows_server_message_verbatim() {
        let n = Notice::from_error(&status(400, r#"{"detail":"Content too long"}"#));
        assert_eq!(n.kind, ErrorKind::Validation);
        assert_eq!(n.message, "Content too long");
        assert!(!n.retry);
    }

    #[test]
    fn server_errors_are_generic_and_retryable() {
        let n = Notice::from_error(&status(502, "<html>bad gateway</html>"));
        assert_eq!(n.message, "Something went wrong. Please try again.");
        assert!(n.retry);
    }

    #[test]
    fn expired_session() {
        let n = Notice::from_error(&status(401, ""));
        assert_eq!(n.kind, ErrorKind::Authentication);
        assert!(n.message.contains("sign in again"));
    }

    #[test]
    fn local_rejections_use_their_own_text() {
        let n = Notice::from_error(&AppError::Invalid("Write something first".into()));
        assert_eq!(n.to_string(), "Write something first");

        let n = Notice::from_error(&AppError::Auth(AuthError::Rejected("Incorrect email or password".into())));
        assert_eq!(n.message, "Incorrect email or password");

        let n = Notice::from_error(&AppError::Auth(AuthError::Connectivity("refused".into())));
        assert!(n.retry);
    }
}
