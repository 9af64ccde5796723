//! Per-backend call spacing.
//!
//! Each backend gets its own async mutex guarding the time of its last call.
//! A caller holds that mutex while it sleeps, so concurrent callers for the
//! same backend queue up and leave at least `min_interval` apart, while
//! callers for different backends never wait on each other.

use std::{sync::Arc, time::Duration};

use {
    dashmap::DashMap,
    tokio::{sync::Mutex, time::Instant},
    tracing::trace,
};

/// Spacing enforcer keyed by backend id.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    slots: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            slots: DashMap::new(),
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `backend_id` may be called again, then stamp the call.
    ///
    /// Returns how long the caller was suspended.
    pub async fn acquire(&self, backend_id: &str) -> Duration {
        let slot = Arc::clone(&self.slots.entry(backend_id.to_string()).or_default());
        let started = Instant::now();
        let mut last_call = slot.lock().await;

        if let Some(prev) = *last_call {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                trace!(backend = backend_id, "rate limiter sleeping");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
        started.elapsed()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
