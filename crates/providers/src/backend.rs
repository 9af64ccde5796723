//! Uniform call contract over HTTP generation backends.

use std::sync::Arc;

use {
    async_trait::async_trait,
    onika_config::BackendConfig,
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    attempt::{AttemptResult, classify_status, snippet},
    descriptor::{AuthScheme, BackendDescriptor},
    error::Result,
    model::GenerationRequest,
    rate_limit::RateLimiter,
    shared_http_client, wire,
};

/// A text-generation backend.
///
/// `invoke` makes at most one logical call and reports every outcome as an
/// [`AttemptResult`]; retries across attempts and failover are the router's
/// job.
///
/// The caller has already acquired `limiter` for the first network call.
/// Any further call made inside the same invocation acquires it again.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn descriptor(&self) -> &BackendDescriptor;

    /// Whether a credential is available. Unconfigured backends answer
    /// [`AttemptResult::Unavailable`] without touching the network.
    fn is_configured(&self) -> bool;

    async fn invoke(&self, request: &GenerationRequest, limiter: &RateLimiter) -> AttemptResult;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn label(&self) -> &str {
        &self.descriptor().label
    }
}

/// Backend spoken to over HTTP in one of the supported wire formats.
pub struct HttpBackend {
    descriptor: Arc<BackendDescriptor>,
    api_key: Option<Secret<String>>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("id", &self.descriptor.id)
            .field("endpoint", &self.descriptor.endpoint)
            .field("model", &self.descriptor.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpBackend {
    #[must_use]
    pub fn new(descriptor: BackendDescriptor, api_key: Option<Secret<String>>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            api_key: api_key.filter(|k| !k.expose_secret().trim().is_empty()),
            client: shared_http_client().clone(),
        }
    }

    /// Build from a config entry, resolving the key from config or env.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let descriptor = BackendDescriptor::from_config(config)?;
        Ok(Self::new(descriptor, config.resolve_api_key()))
    }

    async fn call_once(&self, key: &str, body: &Value) -> AttemptResult {
        let desc = &*self.descriptor;
        let mut req = self
            .client
            .post(&desc.endpoint)
            .timeout(desc.timeout)
            .header("content-type", "application/json")
            .json(body);

        req = match &desc.auth {
            AuthScheme::Bearer => req.header("Authorization", format!("Bearer {key}")),
            AuthScheme::Header { name } => req.header(name.as_str(), key),
        };
        for (name, value) in &desc.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return AttemptResult::TransientError(snippet(&e.to_string())),
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return AttemptResult::TransientError(snippet(&e.to_string())),
        };

        if !status.is_success() {
            return classify_status(status.as_u16(), &text);
        }

        let json: Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(e) => {
                return AttemptResult::TransientError(snippet(&format!("invalid JSON body: {e}")));
            },
        };

        match desc.response_path.extract(&json).map(str::trim) {
            Some(content) if !content.is_empty() => AttemptResult::Success(content.to_string()),
            Some(_) => AttemptResult::TransientError("empty completion".into()),
            None => AttemptResult::TransientError(format!(
                "response missing {}",
                desc.response_path
            )),
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn invoke(&self, request: &GenerationRequest, limiter: &RateLimiter) -> AttemptResult {
        let Some(key) = self.api_key.as_ref() else {
            return AttemptResult::Unavailable;
        };
        let body = wire::build_body(&self.descriptor, request);

        debug!(
            backend = %self.descriptor.id,
            model = %self.descriptor.model,
            turns = request.turns().len(),
            "calling backend"
        );

        let first = self.call_once(key.expose_secret(), &body).await;
        if first != AttemptResult::AuthFailure {
            return first;
        }

        // A 401 can be a transient upstream hiccup; one more try before
        // reporting it.
        warn!(backend = %self.descriptor.id, "401 from backend, retrying once");
        limiter.acquire(&self.descriptor.id).await;
        self.call_once(key.expose_secret(), &body).await
    }
}
