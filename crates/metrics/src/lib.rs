//! Metric names and recorder setup for onika.
//!
//! Crates record through the `metrics` facade macros re-exported here, behind
//! their own `metrics` feature. Nothing is collected until [`init_metrics`]
//! installs a recorder; with the `prometheus` feature that recorder renders
//! the text exposition format for the gateway's `/metrics` route.
//!
//! ```rust,ignore
//! use onika_metrics::{counter, labels, router};
//!
//! counter!(router::ATTEMPTS_TOTAL, labels::BACKEND => "groq").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
