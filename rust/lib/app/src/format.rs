//! Display helpers for timestamps and avatars.

use chrono::{DateTime, NaiveDateTime, Utc};
use rede_client::resolve_media;
use url::Url;

const AVATAR_SERVICE: &str = "https://ui-avatars.com/api/";

/// Parse a backend timestamp. The server sends naive ISO-8601 in UTC;
/// RFC 3339 with an offset is accepted too.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Compact age label: `now`, `5m`, `3h`, `2d`.
///
/// Timestamps in the future read `now`. Unparseable input is returned as is.
pub fn time_ago(created: &str, now: DateTime<Utc>) -> String {
    let Some(created) = parse_timestamp(created) else {
        return created.to_string();
    };
    let minutes = (now - created).num_minutes();
    if minutes < 1 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 60 * 24 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}d", minutes / (60 * 24))
    }
}

/// First letter of up to two words, uppercased.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// The avatar to show for a user: their own, resolved against the backend
/// origin, or a generated initials image.
pub fn avatar_url(origin: &Url, avatar: Option<&str>, name: &str) -> String {
    if let Some(url) = avatar.and_then(|a| resolve_media(origin, a)) {
        return url;
    }
    let params = [
        ("name", name.trim()),
        ("background", "4F46E5"),
        ("color", "fff"),
        ("size", "128"),
    ];
    match Url::parse_with_params(AVATAR_SERVICE, &params) {
        Ok(url) => url.into(),
        Err(_) => AVATAR_SERVICE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
    }

    #[test]
    fn parses_naive_and_offset_timestamps() {
        assert_eq!(parse_timestamp("2024-05-10T12:00:00"), Some(at(12, 0)));
        assert_eq!(parse_timestamp("2024-05-10T12:00:00.123456").map(|d| d.timestamp()), Some(at(12, 0).timestamp()));
        assert_eq!(parse_timestamp("2024-05-10T14:00:00+02:00"), Some(at(12, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn time_ago_buckets() {
        let now = at(12, 0);
        assert_eq!(time_ago("2024-05-10T11:59:30", now), "now");
        assert_eq!(time_ago("2024-05-10T11:55:00", now), "5m");
        assert_eq!(time_ago("2024-05-10T09:00:00", now), "3h");
        assert_eq!(time_ago("2024-05-08T11:00:00", now), "2d");
    }

    #[test]
    fn future_and_garbage_timestamps() {
        let now = at(12, 0);
        assert_eq!(time_ago("2024-05-10T13:00:00", now), "now");
        assert_eq!(time_ago("soon", now), "soon");
    }

    #[test]
    fn initials_take_two_words() {
        assert_eq!(initials("ana maria silva"), "AM");
        assert_eq!(initials("  bo "), "B");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn avatar_prefers_user_image() {
        let api = Url::parse("http://api:8000").unwrap();
        assert_eq!(
            avatar_url(&api, Some("/uploads/me.png"), "Ana"),
            "http://api:8000/uploads/me.png"
        );
        assert_eq!(
            avatar_url(&api, Some("//cdn.example.com/me.png"), "Ana"),
            "http://cdn.example.com/me.png"
        );
        assert_eq!(
            avatar_url(&api, Some(""), "Ana Silva"),
            "https://ui-avatars.com/api/?name=Ana+Silva&background=4F46E5&color=fff&size=128"
        );
        assert!(avatar_url(&api, None, "Zoë").contains("name=Zo%C3%AB"));
        assert!(avatar_url(&api, None, "A&B").contains("name=A%26B&"));
    }
}
