//! Failover routing: pick a backend, respect its rate limit, retry transient
//! failures and fall through the preference order until one succeeds.

pub mod error;
pub mod router;

pub use {
    error::{Error, Result},
    router::{BackendStatus, FailoverRouter, Generation, RetryPolicy},
};
