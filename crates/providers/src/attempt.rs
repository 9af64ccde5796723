//! Outcome of a single backend call and the HTTP status taxonomy.

use std::fmt;

/// Maximum characters of an upstream body or error message carried in a
/// [`AttemptResult::TransientError`].
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Result of one backend invocation. Adapters never fail any other way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// Generated (or transcribed) text, never empty.
    Success(String),
    /// HTTP 429.
    RateLimited,
    /// HTTP 402, the account is out of credit.
    NoCredits,
    /// HTTP 401, after the adapter's own retry.
    AuthFailure,
    /// Any other failure worth retrying: network, timeout, 5xx, bad body.
    TransientError(String),
    /// No credential configured. No network call was made.
    Unavailable,
}

impl AttemptResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the router should retry the same backend after this outcome.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientError(_) | Self::AuthFailure)
    }

    /// Short stable name, used as a metrics label and in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::RateLimited => "rate_limited",
            Self::NoCredits => "no_credits",
            Self::AuthFailure => "auth_failure",
            Self::TransientError(_) => "transient",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for AttemptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(text) => write!(f, "success ({} chars)", text.chars().count()),
            Self::RateLimited => f.write_str("rate limited"),
            Self::NoCredits => f.write_str("no credits"),
            Self::AuthFailure => f.write_str("authentication failed"),
            Self::TransientError(detail) => write!(f, "transient error: {detail}"),
            Self::Unavailable => f.write_str("not configured"),
        }
    }
}

/// Map a non-2xx status to its attempt outcome.
#[must_use]
pub fn classify_status(status: u16, body: &str) -> AttemptResult {
    match status {
        429 => AttemptResult::RateLimited,
        402 => AttemptResult::NoCredits,
        401 => AttemptResult::AuthFailure,
        other => AttemptResult::TransientError(format!("{other}: {}", snippet(body))),
    }
}

/// First [`SNIPPET_MAX_CHARS`] characters of `text`, trimmed.
#[must_use]
pub fn snippet(text: &str) -> String {
    text.trim().chars().take(SNIPPET_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_taxonomy() {
        assert_eq!(classify_status(429, ""), AttemptResult::RateLimited);
        assert_eq!(classify_status(402, ""), AttemptResult::NoCredits);
        assert_eq!(classify_status(401, "bad key"), AttemptResult::AuthFailure);
        assert_eq!(
            classify_status(503, "  overloaded "),
            AttemptResult::TransientError("503: overloaded".into())
        );
    }

    #[test]
    fn snippet_caps_by_chars_not_bytes() {
        let body = "摇".repeat(300);
        let s = snippet(&body);
        assert_eq!(s.chars().count(), SNIPPET_MAX_CHARS);
    }

    #[test]
    fn retryable_outcomes() {
        assert!(AttemptResult::TransientError("x".into()).is_retryable());
        assert!(AttemptResult::AuthFailure.is_retryable());
        assert!(!AttemptResult::RateLimited.is_retryable());
        assert!(!AttemptResult::NoCredits.is_retryable());
        assert!(!AttemptResult::Unavailable.is_retryable());
        assert!(!AttemptResult::Success("x".into()).is_retryable());
    }

    #[test]
    fn unavailable_displays_as_not_configured() {
        assert_eq!(AttemptResult::Unavailable.to_string(), "not configured");
    }
}
