use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    onika_config::SearchConfig,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use onika_metrics::{counter, labels, search as search_metrics};

/// Upper bound on results per query accepted by the Brave API.
const MAX_RESULT_COUNT: u8 = 20;

/// Expired entries are swept once the cache grows past this size.
const CACHE_PRUNE_THRESHOLD: usize = 100;

/// One search hit, in provider rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Snippet, cut to the configured maximum character count.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("search API key not configured")]
    KeyMissing,

    #[error("search API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search request failed: {0}")]
    Network(String),

    #[error("failed to parse search response: {0}")]
    Parse(String),
}

impl SearchError {
    /// Short stable name for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyMissing => "key_missing",
            Self::Status { .. } => "status",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
        }
    }
}

/// A web search backend.
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Up to `result_count` results for `query`.
    async fn search(&self, query: &str, result_count: u8)
    -> Result<Vec<SearchResult>, SearchError>;
}

/// Cached search result with expiry.
struct CacheEntry {
    results: Vec<SearchResult>,
    expires_at: Instant,
}

/// Brave Search client with a small in-memory TTL cache.
pub struct BraveSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<Secret<String>>,
    language: String,
    description_max_chars: usize,
    timeout: Duration,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for BraveSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraveSearch")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("language", &self.language)
            .field("description_max_chars", &self.description_max_chars)
            .finish()
    }
}

impl BraveSearch {
    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            client: crate::shared_http_client().clone(),
            endpoint: config.endpoint.clone(),
            api_key: config.resolve_api_key(),
            language: config.language.clone(),
            description_max_chars: config.description_max_chars,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            cache_ttl: Duration::from_secs(config.cache_ttl_minutes * 60),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Override the API key (blank keys count as missing).
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<Secret<String>>) -> Self {
        self.api_key = api_key.filter(|k| !k.expose_secret().trim().is_empty());
        self
    }

    fn cache_get(&self, key: &str) -> Option<Vec<SearchResult>> {
        let cache = self.cache.lock().ok()?;
        let entry = cache.get(key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.results.clone())
        } else {
            None
        }
    }

    fn cache_set(&self, key: String, results: Vec<SearchResult>) {
        if self.cache_ttl.is_zero() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() > CACHE_PRUNE_THRESHOLD {
                let now = Instant::now();
                cache.retain(|_, e| e.expires_at > now);
            }
            cache.insert(key, CacheEntry {
                results,
                expires_at: Instant::now() + self.cache_ttl,
            });
        }
    }

    async fn fetch(
        &self,
        api_key: &str,
        query: &str,
        count: u8,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut url = format!(
            "{}?q={}&count={count}",
            self.endpoint,
            urlencoding::encode(query)
        );
        if !self.language.trim().is_empty() {
            url.push_str(&format!(
                "&search_lang={}",
                urlencoding::encode(self.language.trim())
            ));
        }

        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: body_text.chars().take(200).collect(),
            });
        }

        let body: serde_json::Value = serde_json::from_str(&body_text).map_err(|error| {
            let snippet: String = body_text.chars().take(200).collect();
            SearchError::Parse(format!("{error}; body starts with: {snippet}"))
        })?;

        let mut results = parse_brave_results(&body, self.description_max_chars);
        results.truncate(usize::from(count));
        Ok(results)
    }
}

#[async_trait]
impl WebSearch for BraveSearch {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(
        &self,
        query: &str,
        result_count: u8,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let Some(api_key) = self.api_key.as_ref() else {
            return Err(SearchError::KeyMissing);
        };
        let query = query.trim();
        let count = result_count.clamp(1, MAX_RESULT_COUNT);

        let cache_key = format!("{}:{count}:{query}", self.language);
        if let Some(cached) = self.cache_get(&cache_key) {
            debug!(query, "web search cache hit");
            #[cfg(feature = "metrics")]
            counter!(search_metrics::CACHE_HITS_TOTAL).increment(1);
            return Ok(cached);
        }

        #[cfg(feature = "metrics")]
        counter!(search_metrics::REQUESTS_TOTAL).increment(1);

        match self.fetch(api_key.expose_secret(), query, count).await {
            Ok(results) => {
                debug!(query, count = results.len(), "web search completed");
                self.cache_set(cache_key, results.clone());
                Ok(results)
            },
            Err(e) => {
                warn!(query, error = %e, "web search failed");
                #[cfg(feature = "metrics")]
                counter!(search_metrics::ERRORS_TOTAL, labels::ERROR_TYPE => e.kind())
                    .increment(1);
                Err(e)
            },
        }
    }
}

/// Parse a Brave JSON response into result rows, dropping rows without a
/// title or URL.
fn parse_brave_results(body: &serde_json::Value, description_max_chars: usize) -> Vec<SearchResult> {
    body.get("web")
        .and_then(|web| web.get("results"))
        .and_then(serde_json::Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|result| {
                    let title = result
                        .get("title")
                        .and_then(serde_json::Value::as_str)
                        .map(str::trim)
                        .unwrap_or("");
                    let url = result
                        .get("url")
                        .and_then(serde_json::Value::as_str)
                        .map(str::trim)
                        .unwrap_or("");
                    if title.is_empty() || url.is_empty() {
                        return None;
                    }
                    let description = result
                        .get("description")
                        .and_then(serde_json::Value::as_str)
                        .map(str::trim)
                        .unwrap_or("");

                    Some(SearchResult {
                        title: title.to_string(),
                        url: url.to_string(),
                        description: truncate_chars(description, description_max_chars),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Render results as numbered lines for inclusion in a prompt.
#[must_use]
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if r.description.is_empty() {
                format!("{}. {} ({})", i + 1, r.title, r.url)
            } else {
                format!("{}. {} ({})\n   {}", i + 1, r.title, r.url, r.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
