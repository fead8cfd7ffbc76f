//! Embedding service trait and implementations.
//!
//! - `OpenAiEmbedding` calls the OpenAI embeddings endpoint and asks for
//!   vectors truncated to the configured dimension. This is the production
//!   backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use labeeb_core::config::OpenAiConfig;
use labeeb_core::text::{normalize, words};
use labeeb_core::{LabeebError, EMBEDDING_DIM};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors that capture
/// semantic meaning. Used both when a task is registered and when a query
/// is searched.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, LabeebError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// Because `EmbeddingService::embed` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Arc<dyn DynEmbeddingService>` to be stored in structs without generics.
///
/// A blanket implementation is provided so that every `EmbeddingService`
/// automatically implements `DynEmbeddingService`.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, LabeebError>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, LabeebError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbedding - remote embeddings endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding service backed by the OpenAI `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedding {
    /// Build a client from the `[openai]` config section.
    ///
    /// Fails when the API key environment variable is unset.
    pub fn from_config(config: &OpenAiConfig, dimensions: usize) -> Result<Self, LabeebError> {
        let api_key = config.api_key().ok_or_else(|| {
            LabeebError::Config(format!("{} is not set", config.api_key_env))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LabeebError::Embedding(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.embedding_model.clone(),
            dimensions,
        })
    }
}

impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LabeebError> {
        if text.trim().is_empty() {
            return Err(LabeebError::Embedding("Cannot embed empty text".to_string()));
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LabeebError::Embedding(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LabeebError::Embedding(format!(
                "Embeddings endpoint returned {}: {}",
                status, detail
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LabeebError::Embedding(format!("Malformed response: {}", e)))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LabeebError::Embedding("Response contained no data".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(LabeebError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        debug!(model = %self.model, chars = text.chars().count(), "Embedded text");
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// Every normalized word maps to a fixed pseudo-random direction and a text
/// embeds as the normalized sum of its words. Identical inputs produce
/// identical outputs and texts sharing words land closer together, which is
/// enough to exercise nearest-neighbour search without a real model.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn word_vector(word: &str) -> Vec<f32> {
        (0..EMBEDDING_DIM)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                i.hash(&mut hasher);
                let h = hasher.finish();
                (((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0) as f32
            })
            .collect()
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let normalized = normalize(text);
        let mut result = vec![0.0f32; EMBEDDING_DIM];
        for word in words(&normalized) {
            for (acc, v) in result.iter_mut().zip(Self::word_vector(word)) {
                *acc += v;
            }
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LabeebError> {
        if text.trim().is_empty() {
            return Err(LabeebError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}
