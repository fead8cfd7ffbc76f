//! Language model collaborator.
//!
//! - `OpenAiChat` calls an OpenAI-compatible `/chat/completions` endpoint.
//! - `UnavailableModel` stands in when no API key is configured; every call
//!   fails so callers take their documented fallback.
//! - `ScriptedModel` replays canned completions for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use labeeb_core::config::OpenAiConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChatError;

/// Author of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A hosted text-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `messages` and return the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32)
        -> Result<String, ChatError>;
}

// ---------------------------------------------------------------------------
// OpenAiChat
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client for one model.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    /// Build a client for `model` from the `[openai]` config section.
    pub fn from_config(config: &OpenAiConfig, model: &str) -> Result<Self, ChatError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| ChatError::Config(format!("{} is not set", config.api_key_env)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ChatError::EmptyCompletion)?;

        debug!(model = %self.model, temperature, chars = content.chars().count(), "Completion received");
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// UnavailableModel
// ---------------------------------------------------------------------------

/// Model used when no endpoint is configured. Always fails.
#[derive(Debug, Clone)]
pub struct UnavailableModel {
    reason: String,
}

impl UnavailableModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for UnavailableModel {
    async fn complete(&self, _: &[ChatMessage], _: f32) -> Result<String, ChatError> {
        Err(ChatError::Unavailable(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// Replays queued completions in order and records every prompt it saw.
///
/// An exhausted script, or a queued `Err`, fails the call.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.push(Err(reason.into()));
        self
    }

    pub fn push(&self, reply: Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Every prompt received, with its temperature.
    pub fn prompts(&self) -> Vec<(Vec<ChatMessage>, f32)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ChatError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((messages.to_vec(), temperature));
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| ChatError::Request(format!("script lock poisoned: {}", e)))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ChatError::Request(reason)),
            None => Err(ChatError::Request("script exhausted".to_string())),
        }
    }
}
