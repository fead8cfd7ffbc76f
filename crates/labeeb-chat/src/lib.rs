//! Labeeb Chat crate - language model access, intent classification, and
//! conversational replies.
//!
//! Every hosted model call goes through the [`LanguageModel`] trait. The
//! classifier and responder never surface its failures: they fall back to
//! the `Chat` intent and a canned apology respectively.

pub mod classifier;
pub mod error;
pub mod llm;
pub mod responder;

pub use classifier::IntentClassifier;
pub use error::ChatError;
pub use llm::{ChatMessage, LanguageModel, OpenAiChat, Role, ScriptedModel, UnavailableModel};
pub use responder::ConversationResponder;
