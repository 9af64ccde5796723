//! Generation backends: descriptors, HTTP adapters and per-backend rate
//! limiting.
//!
//! Every adapter reports its outcome as an [`AttemptResult`]; the failover
//! policy that consumes those results lives in `onika-routing`.

pub mod attempt;
pub mod backend;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod wire;

use std::{collections::HashSet, sync::Arc};

use onika_config::BackendConfig;

pub use {
    attempt::{AttemptResult, classify_status, snippet},
    backend::{GenerationBackend, HttpBackend},
    descriptor::{AuthScheme, BackendDescriptor, ResponsePath, WireFormat},
    error::{Error, Result},
    model::{ChatTurn, GenerationRequest, GenerationRequestBuilder, Role, SamplingParams},
    rate_limit::RateLimiter,
};

/// Shared HTTP client for backend calls.
///
/// All adapters share one connection pool; per-call timeouts come from the
/// descriptor.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}

/// The fixed set of backends, in configuration order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn GenerationBackend>>,
}

impl BackendRegistry {
    /// Build HTTP backends for every configured entry.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self> {
        let mut registry = Self::default();
        for config in configs {
            registry.register(Arc::new(HttpBackend::from_config(config)?))?;
        }
        Ok(registry)
    }

    /// Add a backend. Ids must be unique.
    pub fn register(&mut self, backend: Arc<dyn GenerationBackend>) -> Result<()> {
        if self.get(backend.id()).is_some() {
            return Err(Error::DuplicateBackend(backend.id().to_string()));
        }
        self.backends.push(backend);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn GenerationBackend>> {
        self.backends.iter().find(|b| b.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn GenerationBackend>> {
        self.backends.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Ids of backends that have a credential.
    #[must_use]
    pub fn configured_ids(&self) -> HashSet<&str> {
        self.backends
            .iter()
            .filter(|b| b.is_configured())
            .map(|b| b.id())
            .collect()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| b.id()))
            .finish()
    }
}
