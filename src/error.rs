use thiserror::Error;

use crate::images::EngineError;

/// Failures of a single resolution. Cloneable so that requests waiting on
/// another request's generation can receive the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResizeError {
    #[error("Source out of scope: {0}")]
    OutOfScope(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation error: {0}")]
    Generation(String),
}

impl From<EngineError> for ResizeError {
    fn from(error: EngineError) -> Self {
        ResizeError::Generation(error.to_string())
    }
}
