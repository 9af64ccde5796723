//! Ordered backend cascade with a per-backend retry budget.
//!
//! For each candidate, in order:
//! - unknown or unconfigured: skipped, no call
//! - rate limited or out of credit: next candidate right away
//! - transient or auth failure: same candidate again, up to
//!   [`RetryPolicy::attempts`] calls, pausing [`RetryPolicy::backoff`] between
//! - success: stop and remember the backend as last used

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use {
    onika_config::OnikaConfig,
    onika_providers::{AttemptResult, BackendRegistry, GenerationRequest, RateLimiter},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use {
    onika_metrics::{counter, histogram, labels, router as router_metrics},
    std::time::Instant,
};

use crate::error::{Error, Result};

const NO_BACKENDS: &str = "no backends configured";

/// Retry budget applied to each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls per candidate for retryable failures (not extra retries).
    pub attempts: u32,
    /// Fixed pause between calls to the same candidate.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub backend_id: String,
    pub backend_label: String,
    /// Backend calls made across all candidates, this one included.
    pub attempts: u32,
}

/// Per-backend entry of a status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStatus {
    pub id: String,
    pub label: String,
    pub configured: bool,
}

/// Routes generation requests across the configured backends.
#[derive(Debug)]
pub struct FailoverRouter {
    registry: BackendRegistry,
    limiter: RateLimiter,
    policy: RetryPolicy,
    order: Vec<String>,
    last_used: Mutex<Option<String>>,
}

impl FailoverRouter {
    #[must_use]
    pub fn new(
        registry: BackendRegistry,
        limiter: RateLimiter,
        policy: RetryPolicy,
        order: Vec<String>,
    ) -> Self {
        Self {
            registry,
            limiter,
            policy: RetryPolicy {
                attempts: policy.attempts.max(1),
                ..policy
            },
            order,
            last_used: Mutex::new(None),
        }
    }

    /// Build HTTP backends and router settings from configuration.
    pub fn from_config(config: &OnikaConfig) -> onika_providers::Result<Self> {
        let registry = BackendRegistry::from_config(&config.backends)?;
        let router = &config.router;
        Ok(Self::new(
            registry,
            RateLimiter::new(Duration::from_millis(router.min_interval_ms)),
            RetryPolicy {
                attempts: router.retry_attempts,
                backoff: Duration::from_millis(router.retry_backoff_ms),
            },
            router.order.clone(),
        ))
    }

    /// The configured preference order.
    #[must_use]
    pub fn preferred_order(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Id of the backend that served the most recent successful request.
    #[must_use]
    pub fn last_used(&self) -> Option<String> {
        self.last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Label and credential state of every backend in the preference order,
    /// followed by any registered backend the order leaves out.
    #[must_use]
    pub fn backend_statuses(&self) -> Vec<BackendStatus> {
        let ordered = self
            .order
            .iter()
            .filter_map(|id| self.registry.get(id))
            .chain(
                self.registry
                    .iter()
                    .filter(|b| !self.order.iter().any(|id| id == b.id())),
            );
        let mut statuses: Vec<BackendStatus> = Vec::new();
        for backend in ordered {
            if statuses.iter().any(|s| s.id == backend.id()) {
                continue;
            }
            statuses.push(BackendStatus {
                id: backend.id().to_string(),
                label: backend.label().to_string(),
                configured: backend.is_configured(),
            });
        }
        statuses
    }

    /// Generate with the configured preference order.
    pub async fn generate_default(&self, request: &GenerationRequest) -> Result<Generation> {
        self.generate(request, &self.order).await
    }

    /// Generate text, trying candidates in `preferred_order` with the
    /// request's backend hint (if known) moved to the front.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        preferred_order: &[String],
    ) -> Result<Generation> {
        #[cfg(feature = "metrics")]
        let start = Instant::now();
        #[cfg(feature = "metrics")]
        counter!(router_metrics::REQUESTS_TOTAL).increment(1);

        let candidates = self.candidates(request.backend_hint(), preferred_order);
        let mut last_reason = NO_BACKENDS.to_string();
        let mut attempts_used = 0u32;

        for id in candidates {
            let Some(backend) = self.registry.get(id) else {
                debug!(backend = id, "unknown backend in order, skipping");
                last_reason = format!("{id}: not configured");
                continue;
            };
            if !backend.is_configured() {
                debug!(backend = id, "backend has no credential, skipping");
                last_reason = format!("{id}: not configured");
                continue;
            }

            for attempt in 1..=self.policy.attempts {
                let waited = self.limiter.acquire(id).await;
                #[cfg(feature = "metrics")]
                histogram!(router_metrics::RATE_LIMIT_WAIT_SECONDS, labels::BACKEND => id.to_string())
                    .record(waited.as_secs_f64());
                #[cfg(not(feature = "metrics"))]
                let _ = waited;

                attempts_used += 1;
                let outcome = backend.invoke(request, &self.limiter).await;

                #[cfg(feature = "metrics")]
                counter!(
                    router_metrics::ATTEMPTS_TOTAL,
                    labels::BACKEND => id.to_string(),
                    labels::OUTCOME => outcome.kind()
                )
                .increment(1);

                match outcome {
                    AttemptResult::Success(text) => {
                        info!(
                            backend = id,
                            attempt,
                            attempts_total = attempts_used,
                            chars = text.chars().count(),
                            "generation succeeded"
                        );
                        *self
                            .last_used
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());

                        #[cfg(feature = "metrics")]
                        histogram!(
                            router_metrics::GENERATION_DURATION_SECONDS,
                            labels::BACKEND => id.to_string()
                        )
                        .record(start.elapsed().as_secs_f64());

                        return Ok(Generation {
                            text,
                            backend_id: id.to_string(),
                            backend_label: backend.label().to_string(),
                            attempts: attempts_used,
                        });
                    },
                    AttemptResult::Unavailable => {
                        last_reason = format!("{id}: not configured");
                        break;
                    },
                    AttemptResult::RateLimited | AttemptResult::NoCredits => {
                        warn!(backend = id, outcome = %outcome, "backend refused, trying next");
                        last_reason = format!("{id}: {outcome}");
                        break;
                    },
                    AttemptResult::TransientError(_) | AttemptResult::AuthFailure => {
                        warn!(
                            backend = id,
                            attempt,
                            max_attempts = self.policy.attempts,
                            outcome = %outcome,
                            "backend call failed"
                        );
                        last_reason = format!("{id}: {outcome}");
                        if attempt < self.policy.attempts {
                            tokio::time::sleep(self.policy.backoff).await;
                        }
                    },
                }
            }
        }

        warn!(attempts = attempts_used, reason = %last_reason, "all backends exhausted");
        #[cfg(feature = "metrics")]
        counter!(router_metrics::EXHAUSTED_TOTAL).increment(1);

        Err(Error::AllBackendsExhausted { last_reason })
    }

    /// Hint first when the registry knows it, then `order` without repeats.
    fn candidates<'a>(&self, hint: Option<&'a str>, order: &'a [String]) -> Vec<&'a str> {
        let hint = hint.filter(|id| self.registry.get(id).is_some());
        let mut out: Vec<&str> = Vec::with_capacity(order.len() + 1);
        for id in hint.into_iter().chain(order.iter().map(String::as_str)) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}
