use thiserror::Error;

/// Top-level error type for the Labeeb assistant.
///
/// Subsystem crates define their own error types and implement
/// `From<LabeebError>` so that the `?` operator works across crate boundaries.
/// External-service variants (`Embedding`, `Llm`, `Transcription`, `Speech`)
/// are always handled at the call site with a documented fallback.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LabeebError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Vision error: {0}")]
    Vision(String),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for LabeebError {
    fn from(err: toml::de::Error) -> Self {
        LabeebError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LabeebError {
    fn from(err: toml::ser::Error) -> Self {
        LabeebError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LabeebError {
    fn from(err: serde_json::Error) -> Self {
        LabeebError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Labeeb operations.
pub type Result<T> = std::result::Result<T, LabeebError>;
