//! Text-to-speech.

use std::time::Duration;

use async_trait::async_trait;
use labeeb_core::config::OpenAiConfig;
use serde::Serialize;
use tracing::debug;

use crate::error::VoiceError;

/// Turns reply text into WAV audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    instructions: &'a str,
}

/// OpenAI `/audio/speech` client producing WAV.
#[derive(Debug, Clone)]
pub struct OpenAiSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
    instructions: String,
}

impl OpenAiSpeech {
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
            endpoint: format!("{}/audio/speech", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            instructions: config.tts_instructions.clone(),
        })
    }

    fn request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "wav",
            instructions: &self.instructions,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        debug!(chars = text.chars().count(), voice = %self.voice, "Synthesizing reply");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(text))
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Synthesis(format!(
                "endpoint returned {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        if bytes.is_empty() {
            return Err(VoiceError::Synthesis("empty audio".to_string()));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech() -> OpenAiSpeech {
        OpenAiSpeech {
            client: reqwest::Client::new(),
            endpoint: "http://localhost/audio/speech".to_string(),
            api_key: "test".to_string(),
            model: "gpt-4o-mini-tts".to_string(),
            voice: "echo".to_string(),
            instructions: String::new(),
        }
    }

    #[test]
    fn test_request_body_asks_for_wav() {
        let s = speech();
        let json = serde_json::to_value(s.request("هلا")).unwrap();
        assert_eq!(json["response_format"], "wav");
        assert_eq!(json["input"], "هلا");
        assert_eq!(json["voice"], "echo");
        assert!(json.get("instructions").is_none());
    }

    #[test]
    fn test_request_body_carries_instructions() {
        let mut s = speech();
        s.instructions = "تكلم بلهجة سعودية".to_string();
        let json = serde_json::to_value(s.request("هلا")).unwrap();
        assert_eq!(json["instructions"], "تكلم بلهجة سعودية");
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = OpenAiConfig {
            api_key_env: "LABEEB_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..OpenAiConfig::default()
        };
        assert!(matches!(
            OpenAiSpeech::from_config(&config),
            Err(VoiceError::Config(_))
        ));
    }
}
