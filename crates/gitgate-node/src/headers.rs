//! Response cache headers.
//!
//! Every response that carries repository content gets exactly one of two
//! header sets: refs and text files must never be cached, while
//! content-addressed objects and packs can be cached for a year.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};

/// One year, in seconds.
pub const CACHE_FOREVER_SECS: i64 = 31_536_000;

/// Fixed `Expires` value for non-cacheable responses.
pub const EXPIRED: &str = "Fri, 01 Jan 1980 00:00:00 GMT";

const NO_CACHE_CONTROL: &str = "no-cache, max-age=0, must-revalidate";
const FOREVER_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Cache policy for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Must be revalidated on every request.
    NoCache,
    /// Immutable for a year.
    Forever,
}

impl CachePolicy {
    /// Inserts this policy's headers, replacing any previous cache headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        self.apply_at(headers, Utc::now());
    }

    fn apply_at(&self, headers: &mut HeaderMap, now: DateTime<Utc>) {
        match self {
            CachePolicy::NoCache => {
                headers.remove(header::DATE);
                headers.insert(header::EXPIRES, HeaderValue::from_static(EXPIRED));
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static(NO_CACHE_CONTROL),
                );
            }
            CachePolicy::Forever => {
                let expires = now + Duration::seconds(CACHE_FOREVER_SECS);
                headers.remove(header::PRAGMA);
                headers.insert(header::DATE, http_date(now));
                headers.insert(header::EXPIRES, http_date(expires));
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static(FOREVER_CACHE_CONTROL),
                );
            }
        }
    }
}

/// Formats a timestamp as an RFC 7231 HTTP date.
pub fn http_date(at: DateTime<Utc>) -> HeaderValue {
    let formatted = at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    HeaderValue::from_str(&formatted).unwrap_or_else(|_| HeaderValue::from_static(EXPIRED))
}
