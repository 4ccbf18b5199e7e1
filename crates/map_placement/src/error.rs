//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration and request data, pattern construction failures, result
//! queries outside the class range, and worker failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid world data: {0}")]
    InvalidWorldData(String),

    #[error("invalid layer data: {0}")]
    InvalidLayerData(String),

    #[error("no collision-free point found within {attempts} attempts")]
    MaxAttemptsExceeded { attempts: u32 },

    #[error("class index {index} out of range (num_classes = {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("request needs {requested} candidates, limit is {limit}")]
    TooManyCandidates { requested: usize, limit: usize },

    #[error("malformed result buffer: {0}")]
    InvalidBuffer(String),

    #[error("placement request was dropped before its result was published")]
    Abandoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
