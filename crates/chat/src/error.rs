use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Modify was requested before anything was generated.
    #[error("nothing to modify yet, generate something first")]
    NoPriorArtifact,

    #[error(transparent)]
    Backend(#[from] onika_providers::Error),

    #[error(transparent)]
    Routing(#[from] onika_routing::Error),

    #[error(transparent)]
    Search(#[from] onika_tools::SearchError),

    #[error("web search is not enabled")]
    SearchDisabled,

    #[error("voice transcription is not configured")]
    VoiceUnavailable,

    #[error("transcription failed: {0}")]
    Transcription(String),
}

pub type Result<T> = std::result::Result<T, Error>;
