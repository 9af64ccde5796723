use thiserror::Error;

/// Errors raised while assembling backends from configuration.
///
/// Calls themselves never error; they report an
/// [`AttemptResult`](crate::AttemptResult).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid response path '{0}'")]
    InvalidResponsePath(String),

    #[error("duplicate backend id '{0}'")]
    DuplicateBackend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
