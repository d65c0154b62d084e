//! Client-side session cookie.
//!
//! The cookie carries the username only. Restoring a session means looking
//! that name up in the credential store again; a missing cookie or an unknown
//! name means the user has to log in.

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_COOKIE_NAME: &str = "sensor_user";
pub const DEFAULT_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    name: String,
    ttl: Duration,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, ttl_days: i64) -> Self {
        Self {
            name: name.into(),
            ttl: Duration::days(ttl_days.max(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expiry for a cookie issued at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }

    /// `Set-Cookie` value that persists `username`
    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; Expires={}; HttpOnly; SameSite=Lax",
            self.name,
            encode_value(username),
            self.ttl.num_seconds(),
            self.expires_at(now).format("%a, %d %b %Y %H:%M:%S GMT")
        )
    }

    /// `Set-Cookie` value that deletes the cookie
    pub fn clear(&self) -> String {
        format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax",
            self.name
        )
    }

    /// Username from a `Cookie` request header, if present and non-empty
    pub fn read(&self, cookie_header: &str) -> Option<String> {
        cookie_header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim() == self.name)
            .map(|(_, v)| decode_value(v.trim()))
            .filter(|v| !v.is_empty())
    }
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME, DEFAULT_TTL_DAYS)
    }
}

/// Percent-encode everything outside the cookie-octet set
fn encode_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn decode_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(b) = decoded {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_issue_has_seven_day_expiry() {
        let cookie = SessionCookie::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let header = cookie.issue("somchai", now);

        assert!(header.starts_with("sensor_user=somchai;"));
        assert!(header.contains("Max-Age=604800"));
        assert!(header.contains("Expires=Fri, 08 Mar 2024 08:00:00 GMT"));
    }

    #[test]
    fn test_read_cookie_header() {
        let cookie = SessionCookie::default();
        assert_eq!(
            cookie.read("theme=dark; sensor_user=malee; other=1"),
            Some("malee".to_string())
        );
        assert_eq!(cookie.read("theme=dark"), None);
        assert_eq!(cookie.read("sensor_user="), None);
    }

    #[test]
    fn test_value_encoding_survives_read() {
        let cookie = SessionCookie::default();
        let header = cookie.issue("ops team;1", Utc::now());
        let value = header.split(';').next().unwrap();
        assert_eq!(value, "sensor_user=ops%20team%3B1");
        assert_eq!(cookie.read(value), Some("ops team;1".to_string()));
    }

    #[test]
    fn test_clear_expires_immediately() {
        let cookie = SessionCookie::new("sid", 7);
        assert!(cookie.clear().starts_with("sid=; Path=/; Max-Age=0"));
    }
}
