//! Metric name and label definitions.
//!
//! All metric names used across onika live here so the exported surface is
//! documented in one place.

/// Failover router metrics
pub mod router {
    /// Generation requests entering the router
    pub const REQUESTS_TOTAL: &str = "onika_router_requests_total";
    /// Backend attempts, labelled by backend and outcome
    pub const ATTEMPTS_TOTAL: &str = "onika_router_attempts_total";
    /// Requests that exhausted every backend
    pub const EXHAUSTED_TOTAL: &str = "onika_router_exhausted_total";
    /// End-to-end generation duration in seconds, labelled by winning backend
    pub const GENERATION_DURATION_SECONDS: &str = "onika_router_generation_duration_seconds";
    /// Time spent waiting on the per-backend rate limiter
    pub const RATE_LIMIT_WAIT_SECONDS: &str = "onika_router_rate_limit_wait_seconds";
}

/// Web search metrics
pub mod search {
    /// Search calls issued to the provider
    pub const REQUESTS_TOTAL: &str = "onika_search_requests_total";
    /// Searches served from the in-memory cache
    pub const CACHE_HITS_TOTAL: &str = "onika_search_cache_hits_total";
    /// Search failures, labelled by error type
    pub const ERRORS_TOTAL: &str = "onika_search_errors_total";
}

/// Voice transcription metrics
pub mod voice {
    /// Transcription calls, labelled by outcome
    pub const TRANSCRIPTIONS_TOTAL: &str = "onika_voice_transcriptions_total";
}

/// Telegram channel metrics
pub mod telegram {
    /// Inbound messages
    pub const MESSAGES_RECEIVED_TOTAL: &str = "onika_telegram_messages_received_total";
    /// Commands handled, labelled by command
    pub const COMMANDS_TOTAL: &str = "onika_telegram_commands_total";
    /// Handler failures
    pub const ERRORS_TOTAL: &str = "onika_telegram_errors_total";
}

/// Session state metrics
pub mod sessions {
    /// Number of requesters with a live session record
    pub const ACTIVE: &str = "onika_sessions_active";
    /// Records dropped by TTL or capacity eviction
    pub const EVICTED_TOTAL: &str = "onika_sessions_evicted_total";
}

/// HTTP gateway metrics
pub mod http {
    /// Webhook deliveries received
    pub const WEBHOOK_UPDATES_TOTAL: &str = "onika_http_webhook_updates_total";
    /// Webhook deliveries rejected as malformed
    pub const WEBHOOK_REJECTED_TOTAL: &str = "onika_http_webhook_rejected_total";
}

/// Common label keys
pub mod labels {
    pub const BACKEND: &str = "backend";
    pub const OUTCOME: &str = "outcome";
    pub const ERROR_TYPE: &str = "error_type";
    pub const COMMAND: &str = "command";
    pub const REASON: &str = "reason";
}

/// Histogram buckets
pub mod buckets {
    /// Generation duration (seconds): 100ms to 5 minutes, retries and
    /// failover included.
    pub const GENERATION_DURATION: &[f64] = &[
        0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 180.0, 300.0,
    ];

    /// Rate limiter wait (seconds).
    pub const RATE_LIMIT_WAIT: &[f64] = &[0.0, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0];
}
