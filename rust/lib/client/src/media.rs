use url::Url;

use crate::error::ApiError;

/// Parse the backend origin. Only absolute `http`/`https` URLs with a host
/// are accepted.
pub fn parse_origin(raw: &str) -> Result<Url, ApiError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ApiError::InvalidUrl(raw.to_string())),
    }
}

/// Resolve a media reference returned by the backend.
///
/// Absolute `http`/`https` references pass through (normalized); anything
/// else, including protocol-relative `//host/..` references, is joined onto
/// the origin. Blank references resolve to nothing.
pub fn resolve_media(origin: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(reference) {
        if matches!(url.scheme(), "http" | "https") {
            return Some(url.into());
        }
    }
    origin.join(reference).ok().map(String::from)
}
