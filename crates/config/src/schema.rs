/// Config schema types (server, telegram, backends, router, search, voice,
/// sessions, storage, persona).
use std::collections::HashMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnikaConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub router: RouterConfig,
    /// Generation backends. When empty, [`default_backends`] is used.
    pub backends: Vec<BackendConfig>,
    pub search: SearchConfig,
    pub voice: VoiceConfig,
    pub sessions: SessionsConfig,
    pub storage: StorageConfig,
    pub persona: PersonaConfig,
    pub metrics: MetricsConfig,
}

impl Default for OnikaConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            telegram: TelegramConfig::default(),
            router: RouterConfig::default(),
            backends: default_backends(),
            search: SearchConfig::default(),
            voice: VoiceConfig::default(),
            sessions: SessionsConfig::default(),
            storage: StorageConfig::default(),
            persona: PersonaConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl OnikaConfig {
    /// Look up a backend by id.
    #[must_use]
    pub fn backend(&self, id: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.id == id)
    }
}

/// Webhook gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 8080.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather (overrides `TELEGRAM_TOKEN`).
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// Public URL Telegram should deliver updates to in webhook mode.
    pub webhook_url: Option<String>,
}

impl TelegramConfig {
    /// Resolve the bot token from config, then the `TELEGRAM_TOKEN` env var.
    #[must_use]
    pub fn resolve_token(&self) -> Option<Secret<String>> {
        resolve_secret(self.token.as_ref(), &["TELEGRAM_TOKEN"])
    }
}

/// Failover router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Backend ids in preference order (primary first).
    pub order: Vec<String>,
    /// Minimum spacing between two calls to the same backend, in milliseconds.
    pub min_interval_ms: u64,
    /// Attempts per backend for transient and auth failures (total, not extra).
    pub retry_attempts: u32,
    /// Fixed pause between attempts on the same backend, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            order: vec![
                "moonshot".into(),
                "openrouter".into(),
                "groq".into(),
                "anthropic".into(),
            ],
            min_interval_ms: 1_000,
            retry_attempts: 2,
            retry_backoff_ms: 2_000,
        }
    }
}

/// How a backend expects its credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`.
    #[default]
    Bearer,
    /// The raw key in a named header (e.g. `x-api-key`).
    Header { name: String },
}

/// Request/response dialect spoken by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// OpenAI chat completions (`choices[0].message.content`).
    #[default]
    OpenAiChat,
    /// Anthropic messages API (`content[0].text`, top-level `system`).
    AnthropicMessages,
}

impl WireFormat {
    /// Field path holding the generated text when no explicit rule is configured.
    #[must_use]
    pub fn default_response_path(self) -> &'static str {
        match self {
            Self::OpenAiChat => "choices[0].message.content",
            Self::AnthropicMessages => "content[0].text",
        }
    }
}

/// One generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Stable identifier used in `router.order`.
    pub id: String,
    /// Human-readable label shown to requesters.
    pub label: String,
    /// Full URL of the completion endpoint.
    pub endpoint: String,
    pub model: String,
    /// API key (overrides `api_key_env`).
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: Option<String>,
    pub auth: AuthScheme,
    pub wire: WireFormat,
    /// Field path to the generated text; defaults per wire format.
    pub response_path: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Extra static headers sent on every call.
    pub headers: HashMap<String, String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            label: String::new(),
            endpoint: String::new(),
            model: String::new(),
            api_key: None,
            api_key_env: None,
            auth: AuthScheme::Bearer,
            wire: WireFormat::OpenAiChat,
            response_path: None,
            timeout_secs: 30,
            headers: HashMap::new(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl BackendConfig {
    /// Resolve the API key from config, then the configured env var.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<Secret<String>> {
        let env: Vec<&str> = self.api_key_env.as_deref().into_iter().collect();
        resolve_secret(self.api_key.as_ref(), &env)
    }

    /// The configured response path, or the wire format's default.
    #[must_use]
    pub fn response_path(&self) -> &str {
        self.response_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.wire.default_response_path())
    }
}

/// Built-in backend set: paid primary, free-tier fallback, fast backup,
/// and a spare on a different wire format.
#[must_use]
pub fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            id: "moonshot".into(),
            label: "Kimi (Moonshot)".into(),
            endpoint: "https://api.moonshot.cn/v1/chat/completions".into(),
            model: "moonshot-v1-8k".into(),
            api_key_env: Some("MOONSHOT_API_KEY".into()),
            timeout_secs: 60,
            ..Default::default()
        },
        BackendConfig {
            id: "openrouter".into(),
            label: "DeepSeek (OpenRouter free)".into(),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".into(),
            model: "deepseek/deepseek-chat-v3-0324:free".into(),
            api_key_env: Some("OPENROUTER_API_KEY".into()),
            timeout_secs: 30,
            ..Default::default()
        },
        BackendConfig {
            id: "groq".into(),
            label: "Llama (Groq)".into(),
            endpoint: "https://api.groq.com/openai/v1/chat/completions".into(),
            model: "llama-3.1-8b-instant".into(),
            api_key_env: Some("GROQ_API_KEY".into()),
            timeout_secs: 30,
            ..Default::default()
        },
        BackendConfig {
            id: "anthropic".into(),
            label: "Claude (Anthropic)".into(),
            endpoint: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-5-haiku-latest".into(),
            api_key_env: Some("ANTHROPIC_API_KEY".into()),
            auth: AuthScheme::Header {
                name: "x-api-key".into(),
            },
            wire: WireFormat::AnthropicMessages,
            headers: HashMap::from([("anthropic-version".into(), "2023-06-01".into())]),
            timeout_secs: 60,
            ..Default::default()
        },
    ]
}

/// Web search (Brave-compatible) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    /// Search endpoint URL.
    pub endpoint: String,
    /// Subscription token (overrides `BRAVE_API_KEY`).
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    /// Number of results requested per query.
    pub result_count: u8,
    /// `search_lang` parameter.
    pub language: String,
    /// Maximum characters kept from each result description.
    pub description_max_chars: usize,
    pub timeout_secs: u64,
    /// In-memory cache TTL in minutes (0 to disable).
    pub cache_ttl_minutes: u64,
    /// Augment `/create` requests with search context.
    pub augment_generation: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.search.brave.com/res/v1/web/search".into(),
            api_key: None,
            result_count: 5,
            language: "zh-hans".into(),
            description_max_chars: 200,
            timeout_secs: 15,
            cache_ttl_minutes: 10,
            augment_generation: true,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<Secret<String>> {
        resolve_secret(self.api_key.as_ref(), &["BRAVE_API_KEY"])
    }
}

/// Speech-to-text configuration (OpenAI-compatible transcription endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Base URL; `/audio/transcriptions` is appended.
    pub base_url: String,
    pub model: String,
    /// Language hint (ISO 639-1).
    pub language: Option<String>,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.groq.com/openai/v1".into(),
            model: "whisper-large-v3-turbo".into(),
            language: Some("zh".into()),
            api_key: None,
            api_key_env: "GROQ_API_KEY".into(),
            timeout_secs: 60,
        }
    }
}

impl VoiceConfig {
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<Secret<String>> {
        resolve_secret(self.api_key.as_ref(), &[self.api_key_env.as_str()])
    }
}

/// In-memory session bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Entries untouched for longer than this are dropped (0 disables expiry).
    pub ttl_secs: u64,
    /// Upper bound on tracked requesters; the stalest entry is evicted first.
    pub max_entries: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            max_entries: 10_000,
        }
    }
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; defaults to `<data dir>/artifacts`.
    pub dir: Option<std::path::PathBuf>,
    /// Category used for freshly generated artifacts.
    pub generated_category: String,
    /// Category used for modified artifacts.
    pub modified_category: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            generated_category: "articles".into(),
            modified_category: "revisions".into(),
        }
    }
}

/// Assistant persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub system_prompt: String,
    /// Topic used when `/create` is called without arguments.
    pub default_topic: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "ÖNIKA LI".into(),
            system_prompt: "你是 ÖNIKA LI，摇滚风格AI助手，简洁有力，偶尔用emoji。".into(),
            default_topic: "今日摇滚热点".into(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed (needs the `prometheus` feature).
    pub enabled: bool,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Pick the configured secret if non-blank, else the first non-blank env var.
fn resolve_secret(configured: Option<&Secret<String>>, env_keys: &[&str]) -> Option<Secret<String>> {
    if let Some(secret) = configured
        && !secret.expose_secret().trim().is_empty()
    {
        return Some(secret.clone());
    }
    env_keys.iter().find_map(|key| {
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Secret::new)
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_matches_default_backends() {
        let cfg = OnikaConfig::default();
        for id in &cfg.router.order {
            assert!(cfg.backend(id).is_some(), "missing backend {id}");
        }
        assert_eq!(cfg.router.retry_attempts, 2);
        assert_eq!(cfg.router.retry_backoff_ms, 2_000);
    }

    #[test]
    fn response_path_defaults_per_wire_format() {
        let cfg = OnikaConfig::default();
        assert_eq!(
            cfg.backend("moonshot").unwrap().response_path(),
            "choices[0].message.content"
        );
        assert_eq!(
            cfg.backend("anthropic").unwrap().response_path(),
            "content[0].text"
        );
    }

    #[test]
    fn configured_key_wins_over_env() {
        let backend = BackendConfig {
            api_key: Some(Secret::new("from-config".into())),
            api_key_env: Some("ONIKA_TEST_UNSET_KEY_VAR".into()),
            ..Default::default()
        };
        let key = backend.resolve_api_key().unwrap();
        assert_eq!(key.expose_secret(), "from-config");
    }

    #[test]
    fn blank_key_without_env_is_none() {
        let backend = BackendConfig {
            api_key: Some(Secret::new("   ".into())),
            api_key_env: Some("ONIKA_TEST_DEFINITELY_UNSET".into()),
            ..Default::default()
        };
        assert!(backend.resolve_api_key().is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [router]
            order = ["groq"]

            [[backends]]
            id = "groq"
            label = "Groq"
            endpoint = "https://example.test/v1/chat/completions"
            model = "llama"
            auth = { type = "header", name = "x-key" }
        "#;
        let cfg: OnikaConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.router.order, vec!["groq"]);
        assert_eq!(cfg.router.min_interval_ms, 1_000);
        assert_eq!(cfg.backends.len(), 1);
        assert_eq!(cfg.backends[0].auth, AuthScheme::Header {
            name: "x-key".into()
        });
        assert_eq!(cfg.backends[0].timeout_secs, 30);
        assert_eq!(cfg.search.description_max_chars, 200);
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg = TelegramConfig {
            token: Some(Secret::new("123:SECRET".into())),
            webhook_url: None,
        };
        assert!(!format!("{cfg:?}").contains("123:SECRET"));
    }
}
