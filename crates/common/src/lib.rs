//! Shared types used across onika crates.

pub mod error;
pub mod types;

pub use {error::FromMessage, types::RequesterId};
