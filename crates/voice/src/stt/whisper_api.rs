//! OpenAI-compatible `/audio/transcriptions` client.
//!
//! Groq serves Whisper models behind this API shape, and it is the default;
//! any endpoint accepting the same multipart form works.

use std::time::Duration;

use {
    async_trait::async_trait,
    onika_config::VoiceConfig,
    onika_providers::{AttemptResult, classify_status, shared_http_client, snippet},
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use onika_metrics::{counter, labels, voice as voice_metrics};

use super::{SttProvider, TranscribeRequest};

/// Groq API base URL.
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default Whisper model on Groq.
const DEFAULT_MODEL: &str = "whisper-large-v3-turbo";

/// Whisper-style transcription over HTTP.
#[derive(Clone)]
pub struct WhisperApiStt {
    client: Client,
    api_key: Option<Secret<String>>,
    base_url: String,
    model: String,
    language: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for WhisperApiStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperApiStt")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("language", &self.language)
            .finish()
    }
}

impl WhisperApiStt {
    /// Groq defaults with the given key.
    #[must_use]
    pub fn new(api_key: Option<Secret<String>>) -> Self {
        Self {
            client: shared_http_client().clone(),
            api_key: api_key.filter(|k| !k.expose_secret().trim().is_empty()),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            language: None,
            timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn from_config(config: &VoiceConfig) -> Self {
        let mut stt = Self::new(config.resolve_api_key())
            .with_base_url(config.base_url.clone())
            .with_language(config.language.clone());
        if !config.model.trim().is_empty() {
            stt.model = config.model.clone();
        }
        stt.timeout = Duration::from_secs(config.timeout_secs.max(1));
        stt
    }

    /// Override the base URL (`/audio/transcriptions` is appended).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|l| !l.trim().is_empty());
        self
    }

    fn build_form(&self, request: &TranscribeRequest) -> Option<Form> {
        let file_part = Part::bytes(request.audio.to_vec())
            .file_name(format!("audio.{}", request.format.extension()))
            .mime_str(request.format.mime_type())
            .ok()?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        if let Some(language) = request.language.clone().or_else(|| self.language.clone()) {
            form = form.text("language", language);
        }
        Some(form)
    }

    async fn call_once(&self, key: &str, request: &TranscribeRequest) -> AttemptResult {
        // Forms are consumed by send, so each call builds its own.
        let Some(form) = self.build_form(request) else {
            return AttemptResult::TransientError("invalid audio mime type".into());
        };

        let resp = match self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {key}"))
            .multipart(form)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return AttemptResult::TransientError(snippet(&e.to_string())),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => return AttemptResult::TransientError(snippet(&e.to_string())),
        };
        if !status.is_success() {
            return classify_status(status.as_u16(), &body);
        }

        match serde_json::from_str::<TranscriptionResponse>(&body) {
            Ok(parsed) if !parsed.text.trim().is_empty() => {
                AttemptResult::Success(parsed.text.trim().to_string())
            },
            Ok(_) => AttemptResult::TransientError("empty transcript".into()),
            Err(e) => AttemptResult::TransientError(snippet(&format!("invalid JSON body: {e}"))),
        }
    }
}

#[async_trait]
impl SttProvider for WhisperApiStt {
    fn id(&self) -> &str {
        "whisper-api"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(&self, request: TranscribeRequest) -> AttemptResult {
        let Some(key) = self.api_key.as_ref() else {
            return AttemptResult::Unavailable;
        };

        debug!(
            model = %self.model,
            bytes = request.audio.len(),
            format = request.format.extension(),
            "transcribing audio"
        );

        let mut outcome = self.call_once(key.expose_secret(), &request).await;
        if outcome == AttemptResult::AuthFailure {
            warn!("401 from transcription endpoint, retrying once");
            outcome = self.call_once(key.expose_secret(), &request).await;
        }

        #[cfg(feature = "metrics")]
        counter!(voice_metrics::TRANSCRIPTIONS_TOTAL, labels::OUTCOME => outcome.kind())
            .increment(1);

        outcome
    }
}

// ── API Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}
