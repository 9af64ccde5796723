//! The assistant itself: turns commands and free text into routed
//! generations, web searches and remembered artifacts.

pub mod error;
pub mod intent;
pub mod prompt;
pub mod service;

pub use {
    error::{Error, Result},
    intent::{Intent, classify},
    service::{Artifact, AssistantService, ChatSettings, Reply, StatusReport},
};
