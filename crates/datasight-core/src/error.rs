use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSightError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Another request is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ingest error: {file}: {message}")]
    Ingest { file: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl DataSightError {
    pub fn ingest(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingest {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Whether a remote call that failed this way is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::Http(_) | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, DataSightError>;
