//! Labeeb Vector crate - flat L2 embedding index and embedding services.
//!
//! Provides the in-memory nearest-neighbour index the task store keeps in
//! lock-step with its task list, an embedding service trait, an
//! OpenAI-backed implementation, and a deterministic mock for testing.

pub mod embedding;
pub mod index;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OpenAiEmbedding};
pub use index::{EmbeddingIndex, IndexError, SearchHit};
