//! # Time Helpers
//!
//! Credential expiry is computed from a trusted clock. The primary source is
//! the backend's HTTP `Date` header; the fallback is local time minus a
//! safety buffer so a fast local clock cannot mint an expiry the contract
//! would consider to be in the future.

use chrono::{DateTime, Utc};

/// Current local time, unix milliseconds.
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Local time minus `buffer_ms`, unix milliseconds.
pub fn buffered_now_ms(buffer_ms: u64) -> u64 {
    now_ms().saturating_sub(buffer_ms)
}

/// Parse an HTTP `Date` header (RFC 7231 IMF-fixdate) into unix
/// milliseconds.
pub fn parse_http_date(value: &str) -> Option<u64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .and_then(|dt| u64::try_from(dt.with_timezone(&Utc).timestamp_millis()).ok())
}

/// Credential expiry in unix seconds: `now_ms` truncated to seconds plus
/// `duration_secs`.
pub fn valid_until_secs(now_ms: u64, duration_secs: u64) -> u64 {
    (now_ms / 1000).saturating_add(duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_imf_fixdate() {
        let ms = parse_http_date("Tue, 14 Nov 2023 22:13:20 GMT").unwrap();
        assert_eq!(ms, 1_700_000_000_000);
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_http_date("yesterday"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[test]
    fn buffer_is_subtracted() {
        let before = now_ms();
        let buffered = buffered_now_ms(6000);
        assert!(buffered + 6000 >= before);
        assert!(buffered < now_ms());
    }

    #[test]
    fn valid_until_adds_duration() {
        assert_eq!(valid_until_secs(1_700_000_000_999, 3600), 1_700_003_600);
    }
}
