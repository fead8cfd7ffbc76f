//! Speech-to-text.
//!
//! Recorded utterances are sent to an OpenAI-compatible
//! `/audio/transcriptions` endpoint with a language code and a short
//! prompt that biases the recognizer (towards the wake word while idle,
//! towards Saudi dialect inside a session).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use labeeb_core::config::OpenAiConfig;
use tracing::debug;

use crate::error::VoiceError;

/// A recorded utterance.
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// WAV bytes already in memory.
    Bytes(Vec<u8>),
    /// Path to an audio file on disk.
    File(PathBuf),
}

impl AudioInput {
    async fn into_bytes(self) -> Result<(Vec<u8>, String), VoiceError> {
        match self {
            AudioInput::Bytes(bytes) => Ok((bytes, "utterance.wav".to_string())),
            AudioInput::File(path) => {
                let bytes = tokio::fs::read(&path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "utterance.wav".to_string());
                Ok((bytes, name))
            }
        }
    }
}

/// Turns recorded speech into text.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe `audio` spoken in `language`, biased by `prompt`.
    async fn transcribe(
        &self,
        audio: AudioInput,
        language: &str,
        prompt: &str,
    ) -> Result<String, VoiceError>;
}

#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper transcription over HTTP.
#[derive(Debug, Clone)]
pub struct OpenAiTranscription {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiTranscription {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, VoiceError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| VoiceError::Config(format!("{} is not set", config.api_key_env)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/audio/transcriptions",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            model: config.stt_model.clone(),
        })
    }
}

#[async_trait]
impl TranscriptionService for OpenAiTranscription {
    async fn transcribe(
        &self,
        audio: AudioInput,
        language: &str,
        prompt: &str,
    ) -> Result<String, VoiceError> {
        let (bytes, file_name) = audio.into_bytes().await?;
        debug!(audio_bytes = bytes.len(), model = %self.model, "Starting transcription");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("prompt", prompt.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Transcription(format!(
                "endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(format!("malformed response: {}", e)))?;

        let text = clean_transcript(&parsed.text);
        debug!(transcript = %text, "Transcription complete");
        Ok(text)
    }
}

/// Trim and lower-case a raw transcript.
pub fn clean_transcript(raw: &str) -> String {
    raw.trim().to_lowercase()
}
