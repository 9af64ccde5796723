#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Every candidate failed or was skipped. Carries the reason reported by
    /// the last candidate considered.
    #[error("all backends exhausted: {last_reason}")]
    AllBackendsExhausted { last_reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
