//! Speech-to-text provider abstraction.

mod whisper_api;

pub use whisper_api::WhisperApiStt;

use {async_trait::async_trait, bytes::Bytes, onika_providers::AttemptResult};

/// Container format of an audio clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// Opus in OGG, what Telegram voice notes use.
    #[default]
    Ogg,
    Mp3,
    M4a,
    Wav,
    Webm,
}

impl AudioFormat {
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Ogg => "audio/ogg",
            Self::Mp3 => "audio/mpeg",
            Self::M4a => "audio/mp4",
            Self::Wav => "audio/wav",
            Self::Webm => "audio/webm",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Webm => "webm",
        }
    }

    /// Guess the format from a MIME type such as `audio/mpeg`.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence.to_ascii_lowercase().as_str() {
            "audio/ogg" | "audio/opus" | "application/ogg" => Some(Self::Ogg),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => Some(Self::M4a),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Self::Wav),
            "audio/webm" => Some(Self::Webm),
            _ => None,
        }
    }
}

/// Request to transcribe audio to text.
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    /// Raw audio data.
    pub audio: Bytes,
    pub format: AudioFormat,
    /// Language hint (ISO 639-1). Falls back to the provider's default.
    pub language: Option<String>,
}

impl TranscribeRequest {
    #[must_use]
    pub fn new(audio: impl Into<Bytes>, format: AudioFormat) -> Self {
        Self {
            audio: audio.into(),
            format,
            language: None,
        }
    }
}

/// Speech-to-text provider.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Provider identifier (e.g. "groq").
    fn id(&self) -> &str;

    /// Whether a credential is available.
    fn is_configured(&self) -> bool;

    /// Transcribe audio. Success carries the transcript, never empty.
    async fn transcribe(&self, request: TranscribeRequest) -> AttemptResult;
}
