use serde_json::Value;

/// Client-side API error.
///
/// `Network` means the request never completed; everything else means the
/// server answered (or answered with something unreadable).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The configured server origin is not an absolute http(s) URL.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    #[error("decode: {0}")]
    Decode(String),
}

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never reached the server. Offer a retry.
    Connectivity,
    /// Credential missing, expired or rejected. Sign out.
    Authentication,
    /// 4xx with a message meant for the user.
    Validation,
    /// 5xx or a response we could not read.
    Server,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) => ErrorKind::Connectivity,
            ApiError::Status { status: 401, .. } => ErrorKind::Authentication,
            ApiError::Status { status, .. } if (400..500).contains(status) => ErrorKind::Validation,
            ApiError::Status { .. } => ErrorKind::Server,
            ApiError::Decode(_) => ErrorKind::Server,
            ApiError::InvalidUrl(_) => ErrorKind::Validation,
        }
    }

    /// HTTP status, when the server answered with an error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Connectivity
    }

    /// The server-provided message: `detail` or `message` from a JSON error
    /// body, otherwise the raw body text. `None` for non-HTTP failures.
    pub fn server_message(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self else {
            return None;
        };
        let parsed = serde_json::from_str::<Value>(body).ok();
        let field = parsed.as_ref().and_then(|v| {
            v.get("detail")
                .and_then(Value::as_str)
                .or_else(|| v.get("message").and_then(Value::as_str))
        });
        match field {
            Some(msg) => Some(msg.to_string()),
            None if body.trim().is_empty() => None,
            None => Some(body.clone()),
        }
    }
}
