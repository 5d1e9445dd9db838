//! Shared utility functions for provider adapters.

use std::time::Duration;
use sw_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Map a non-success provider response to the domain error taxonomy.
///
/// HTTP 429 becomes [`Error::RateLimited`], honoring a `Retry-After`
/// header when present; everything else becomes [`Error::Provider`].
pub(crate) fn classify_status(
    provider: &str,
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> Error {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Error::RateLimited {
            provider: provider.to_string(),
            retry_after,
        }
    } else {
        Error::Provider {
            provider: provider.to_string(),
            message: format!("HTTP {} - {}", status.as_u16(), body),
        }
    }
}

/// Parse a `Retry-After` header value (delta-seconds form only).
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
