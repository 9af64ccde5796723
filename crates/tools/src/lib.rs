//! Side tools used by the assistant: web search for prompt context and
//! on-disk storage of generated artifacts.

pub mod storage;
pub mod web_search;

pub use {
    storage::{ArtifactStore, FsArtifactStore, StorageError, slugify},
    web_search::{BraveSearch, SearchError, SearchResult, WebSearch, format_context},
};

/// Shared HTTP client for tools that make outbound requests.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}
