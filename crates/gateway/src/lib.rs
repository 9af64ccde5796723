//! HTTP surface of the assistant.
//!
//! Serves a liveness string, a JSON health report and the Telegram webhook
//! intake. With the `prometheus` feature, `/metrics` exposes the recorder.

#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod server;

pub use server::{AppState, build_app, start_gateway};
