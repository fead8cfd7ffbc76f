//! Error types for speech input and output.

use labeeb_core::LabeebError;

/// Errors from transcription, synthesis, playback and input sources.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("input error: {0}")]
    Input(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VoiceError> for LabeebError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Transcription(msg) => LabeebError::Transcription(msg),
            VoiceError::Config(msg) => LabeebError::Config(msg),
            VoiceError::Io(e) => LabeebError::Io(e),
            other => LabeebError::Speech(other.to_string()),
        }
    }
}

impl From<LabeebError> for VoiceError {
    fn from(err: LabeebError) -> Self {
        match err {
            LabeebError::Config(msg) => VoiceError::Config(msg),
            LabeebError::Io(e) => VoiceError::Io(e),
            other => VoiceError::Input(other.to_string()),
        }
    }
}
