use std::time::Duration;

/// Base delay before the first retry.
const BASE_DELAY: Duration = Duration::from_millis(500);
/// Upper bound for any single backoff.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Statuses worth retrying: request timeout and transient gateway/server
/// failures. 429 is reported separately as a rate limit.
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// Delay before retry number `attempt` (0-based).
///
/// A server-provided `Retry-After` wins; otherwise exponential backoff.
#[must_use]
pub fn backoff_delay(attempt: u32, retry_after: Option<u64>) -> Duration {
    if let Some(secs) = retry_after {
        return Duration::from_secs(secs).min(MAX_DELAY);
    }
    BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        for status in [408, 500, 502, 503, 504] {
            assert!(is_transient_status(status), "{status}");
        }
    }

    #[test]
    fn test_client_errors_not_transient() {
        for status in [400, 401, 403, 404, 422, 429, 501] {
            assert!(!is_transient_status(status), "{status}");
        }
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(0, None), Duration::from_millis(500));
        assert_eq!(backoff_delay(1, None), Duration::from_secs(1));
        assert_eq!(backoff_delay(3, None), Duration::from_secs(4));
        assert_eq!(backoff_delay(20, None), MAX_DELAY);
        assert_eq!(backoff_delay(0, Some(7)), Duration::from_secs(7));
        assert_eq!(backoff_delay(0, Some(600)), MAX_DELAY);
    }
}
