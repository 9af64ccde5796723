//! The assistant's entry points, one per command or intent.

use std::sync::Arc;

use {
    bytes::Bytes,
    onika_common::RequesterId,
    onika_config::{OnikaConfig, PersonaConfig},
    onika_providers::AttemptResult,
    onika_routing::{BackendStatus, FailoverRouter, Generation},
    onika_sessions::{SessionRecord, SessionStore},
    onika_tools::{ArtifactStore, BraveSearch, FsArtifactStore, SearchResult, WebSearch},
    onika_voice::{AudioFormat, SttProvider, TranscribeRequest, WhisperApiStt},
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    intent::{self, Intent},
    prompt,
};

/// Tunables that don't belong to any collaborator.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub persona: PersonaConfig,
    /// Results requested per search.
    pub search_result_count: u8,
    /// Feed search results into topic generation.
    pub augment_generation: bool,
    pub generated_category: String,
    pub modified_category: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&OnikaConfig::default())
    }
}

impl ChatSettings {
    #[must_use]
    pub fn from_config(config: &OnikaConfig) -> Self {
        Self {
            persona: config.persona.clone(),
            search_result_count: config.search.result_count,
            augment_generation: config.search.augment_generation,
            generated_category: config.storage.generated_category.clone(),
            modified_category: config.storage.modified_category.clone(),
        }
    }
}

/// A generated or modified artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub text: String,
    pub topic: String,
    pub backend_id: String,
    pub backend_label: String,
    /// Storage location; `None` when storage is off or failed.
    pub location: Option<String>,
    /// Search results used as context, empty when none were available.
    pub sources: Vec<SearchResult>,
}

/// Reply to a free-text message after intent dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Artifact(Artifact),
    Search {
        query: String,
        results: Vec<SearchResult>,
    },
    Chat(Generation),
}

/// Snapshot for the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub backends: Vec<BackendStatus>,
    /// Backend that served the latest successful request.
    pub last_used: Option<String>,
    pub search_available: bool,
    pub voice_available: bool,
    pub active_sessions: usize,
}

impl StatusReport {
    /// Label of the last used backend, if it is still registered.
    #[must_use]
    pub fn last_used_label(&self) -> Option<&str> {
        let id = self.last_used.as_deref()?;
        self.backends
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.label.as_str())
    }
}

/// Glues the router, search, storage, sessions and transcription together.
pub struct AssistantService {
    router: Arc<FailoverRouter>,
    sessions: Arc<SessionStore>,
    search: Option<Arc<dyn WebSearch>>,
    store: Option<Arc<dyn ArtifactStore>>,
    stt: Option<Arc<dyn SttProvider>>,
    settings: ChatSettings,
}

impl std::fmt::Debug for AssistantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantService")
            .field("router", &self.router)
            .field("search", &self.search.is_some())
            .field("store", &self.store.is_some())
            .field("stt", &self.stt.is_some())
            .finish()
    }
}

impl AssistantService {
    #[must_use]
    pub fn new(router: Arc<FailoverRouter>, sessions: Arc<SessionStore>) -> Self {
        Self {
            router,
            sessions,
            search: None,
            store: None,
            stt: None,
            settings: ChatSettings::default(),
        }
    }

    /// Wire every collaborator from configuration. Search and voice are
    /// attached only when enabled.
    pub fn from_config(config: &OnikaConfig) -> Result<Self> {
        let router = FailoverRouter::from_config(config)?;
        let mut service = Self::new(
            Arc::new(router),
            Arc::new(SessionStore::from_config(&config.sessions)),
        )
        .with_settings(ChatSettings::from_config(config));

        if config.search.enabled {
            service = service.with_search(Arc::new(BraveSearch::from_config(&config.search)));
        }
        if config.voice.enabled {
            service = service.with_stt(Arc::new(WhisperApiStt::from_config(&config.voice)));
        }
        let root = config
            .storage
            .dir
            .clone()
            .unwrap_or_else(|| onika_config::data_dir().join("artifacts"));
        debug!(root = %root.display(), "artifact storage");
        Ok(service.with_store(Arc::new(FsArtifactStore::new(root))))
    }

    #[must_use]
    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_stt(mut self, stt: Arc<dyn SttProvider>) -> Self {
        self.stt = Some(stt);
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn persona(&self) -> &PersonaConfig {
        &self.settings.persona
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Generate an artifact about `topic` (the persona's default topic when
    /// blank), optionally grounded in web search results.
    pub async fn generate_from_topic(&self, requester: &RequesterId, topic: &str) -> Result<Artifact> {
        let topic = match topic.trim() {
            "" => self.settings.persona.default_topic.clone(),
            t => t.to_string(),
        };

        let sources = if self.settings.augment_generation {
            self.search_context(&topic).await
        } else {
            Vec::new()
        };
        if sources.is_empty() {
            debug!(topic = %topic, note = prompt::NO_WEB_CONTEXT, "generating without search results");
        }

        let request = prompt::generation(&self.settings.persona.system_prompt, &topic, &sources);
        let generation = self.router.generate_default(&request).await?;
        let location = self
            .store_artifact(&topic, &generation.text, &self.settings.generated_category)
            .await;

        self.sessions.record(
            requester,
            SessionRecord::new(generation.text.clone(), topic.clone())
                .with_location(location.clone())
                .with_search(sources.clone()),
        );
        info!(
            requester = %requester,
            backend = %generation.backend_id,
            sources = sources.len(),
            "artifact generated"
        );

        Ok(Artifact {
            text: generation.text,
            topic,
            backend_id: generation.backend_id,
            backend_label: generation.backend_label,
            location,
            sources,
        })
    }

    /// Rework the requester's last artifact according to `instruction`.
    pub async fn modify_last(&self, requester: &RequesterId, instruction: &str) -> Result<Artifact> {
        let prior = self.sessions.get(requester).ok_or(Error::NoPriorArtifact)?;

        let request = prompt::modification(
            &self.settings.persona.system_prompt,
            &prior.last_artifact,
            instruction.trim(),
        );
        let generation = self.router.generate_default(&request).await?;
        let location = self
            .store_artifact(&prior.last_topic, &generation.text, &self.settings.modified_category)
            .await;

        self.sessions.record(
            requester,
            SessionRecord::new(generation.text.clone(), prior.last_topic.clone())
                .with_location(location.clone())
                .with_search(prior.last_search.clone()),
        );
        info!(requester = %requester, backend = %generation.backend_id, "artifact modified");

        Ok(Artifact {
            text: generation.text,
            topic: prior.last_topic,
            backend_id: generation.backend_id,
            backend_label: generation.backend_label,
            location,
            sources: prior.last_search,
        })
    }

    /// Search the web.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let search = self.search.as_ref().ok_or(Error::SearchDisabled)?;
        let query = match query.trim() {
            "" => self.settings.persona.default_topic.as_str(),
            q => q,
        };
        Ok(search.search(query, self.settings.search_result_count).await?)
    }

    /// Free conversation in the persona's voice.
    pub async fn chat(&self, message: &str) -> Result<Generation> {
        let request = prompt::chat(&self.settings.persona.system_prompt, message);
        Ok(self.router.generate_default(&request).await?)
    }

    /// One-line self-introduction.
    pub async fn hello(&self) -> Result<Generation> {
        self.chat(prompt::HELLO_PROMPT).await
    }

    /// Backends in failover order; unlike [`Self::status`] this never walks
    /// the session store.
    #[must_use]
    pub fn backend_statuses(&self) -> Vec<BackendStatus> {
        self.router.backend_statuses()
    }

    #[must_use]
    pub fn status(&self) -> StatusReport {
        StatusReport {
            backends: self.backend_statuses(),
            last_used: self.router.last_used(),
            search_available: self.search.as_ref().is_some_and(|s| s.is_configured()),
            voice_available: self.stt.as_ref().is_some_and(|s| s.is_configured()),
            active_sessions: self.sessions.len(),
        }
    }

    /// Turn an audio clip into text.
    pub async fn transcribe(&self, audio: Bytes, format: AudioFormat) -> Result<String> {
        let stt = self.stt.as_ref().ok_or(Error::VoiceUnavailable)?;
        match stt.transcribe(TranscribeRequest::new(audio, format)).await {
            AttemptResult::Success(text) => Ok(text),
            AttemptResult::Unavailable => Err(Error::VoiceUnavailable),
            other => Err(Error::Transcription(other.to_string())),
        }
    }

    /// Classify free text and dispatch to the matching entry point.
    pub async fn handle_text(&self, requester: &RequesterId, text: &str) -> Result<Reply> {
        let has_prior = self.sessions.contains(requester);
        match intent::classify(text, has_prior) {
            Intent::Modify(instruction) => {
                self.modify_last(requester, &instruction).await.map(Reply::Artifact)
            },
            Intent::Generate(topic) => self
                .generate_from_topic(requester, &topic)
                .await
                .map(Reply::Artifact),
            Intent::Search(query) if self.search.is_some() => {
                let results = self.search(&query).await?;
                Ok(Reply::Search { query, results })
            },
            Intent::Search(_) | Intent::Chat(_) => {
                self.chat(text.trim()).await.map(Reply::Chat)
            },
        }
    }

    async fn search_context(&self, topic: &str) -> Vec<SearchResult> {
        let Some(search) = self.search.as_ref() else {
            return Vec::new();
        };
        if !search.is_configured() {
            return Vec::new();
        }
        match search.search(topic, self.settings.search_result_count).await {
            Ok(results) => results,
            Err(e) => {
                warn!(topic, error = %e, "search unavailable, generating without context");
                Vec::new()
            },
        }
    }

    async fn store_artifact(&self, name: &str, content: &str, category: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.store(name, content, category).await {
            Ok(location) => Some(location),
            Err(e) => {
                warn!(name, category, error = %e, "failed to store artifact");
                None
            },
        }
    }
}
