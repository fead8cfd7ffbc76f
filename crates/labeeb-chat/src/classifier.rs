//! Intent classification.
//!
//! The model is asked to answer with exactly one literal token per intent
//! (see [`Intent::token`]). Anything else, and any failed call, maps to
//! [`Intent::Chat`].

use std::sync::Arc;

use labeeb_core::text::normalize;
use labeeb_core::Intent;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, LanguageModel};

/// Utterances that mean "delete everything" without asking the model.
const DELETE_ALL_KEYWORDS: &[&str] = &["احذف كل", "احذف المهام كلها", "امسح كل المهام"];

/// Maps an utterance to one of the closed set of intents.
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Classify `utterance`. Never fails.
    pub async fn classify(&self, utterance: &str) -> Intent {
        let normalized = normalize(utterance);
        if DELETE_ALL_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            debug!("Delete-all keyword matched, skipping model");
            return Intent::DeleteAll;
        }

        let prompt = [ChatMessage::user(build_prompt(utterance))];
        match self.model.complete(&prompt, self.temperature).await {
            Ok(answer) => match parse_token(&answer) {
                Some(intent) => {
                    debug!(%intent, "Utterance classified");
                    intent
                }
                None => {
                    warn!(%answer, "Classifier answered outside the token set, using chat");
                    Intent::Chat
                }
            },
            Err(e) => {
                warn!(error = %e, "Classification failed, using chat");
                Intent::Chat
            }
        }
    }
}

fn build_prompt(utterance: &str) -> String {
    format!(
        "المستخدم قال باللهجة السعودية: \"{utterance}\"\n\n\
         هل هذا طلب:\n\
         - تسجيل مهمة جديدة؟ (أجب: {register})\n\
         - تذكير/استفسار عن المهام؟ (أجب: {recall})\n\
         - حذف مهمة واحدة؟ (أجب: {delete})\n\
         - حذف جميع المهام؟ (أجب: {delete_all})\n\
         - أو شيء ثاني؟ (أجب: {chat})\n\n\
         رد بكلمة واحدة فقط: {register} أو {recall} أو {delete} أو {delete_all} أو {chat}.",
        register = Intent::Register.token(),
        recall = Intent::Recall.token(),
        delete = Intent::Delete.token(),
        delete_all = Intent::DeleteAll.token(),
        chat = Intent::Chat.token(),
    )
}

/// Exact token match after stripping quotes and trailing punctuation.
fn parse_token(answer: &str) -> Option<Intent> {
    let token = answer.trim().trim_matches(|c: char| {
        c.is_whitespace() || "\"'`«».،:!؟?".contains(c)
    });
    Intent::from_token(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    fn classifier(model: ScriptedModel) -> (IntentClassifier, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        (IntentClassifier::new(model.clone(), 0.0), model)
    }

    #[tokio::test]
    async fn test_each_token_maps_to_intent() {
        for intent in Intent::ALL {
            let (c, _) = classifier(ScriptedModel::new().reply(intent.token()));
            assert_eq!(c.classify("اي شي").await, intent);
        }
    }

    #[tokio::test]
    async fn test_token_with_punctuation_and_whitespace() {
        let (c, _) = classifier(ScriptedModel::new().reply("  \"تسجيل\".\n"));
        assert_eq!(c.classify("سجل موعد").await, Intent::Register);
    }

    #[tokio::test]
    async fn test_unexpected_answer_is_chat() {
        let (c, _) = classifier(ScriptedModel::new().reply("أعتقد أنه تسجيل"));
        assert_eq!(c.classify("سجل موعد").await, Intent::Chat);
    }

    #[tokio::test]
    async fn test_model_failure_is_chat() {
        let (c, _) = classifier(ScriptedModel::new().fail("timeout"));
        assert_eq!(c.classify("سجل موعد").await, Intent::Chat);
    }

    #[tokio::test]
    async fn test_delete_all_keyword_skips_model() {
        let (c, model) = classifier(ScriptedModel::new());
        assert_eq!(c.classify("احذف كل المهام").await, Intent::DeleteAll);
        assert_eq!(c.classify("احذف المهام كلها لو سمحت").await, Intent::DeleteAll);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_prompt_embeds_utterance_and_temperature() {
        let (c, model) = classifier(ScriptedModel::new().reply("تذكير"));
        c.classify("وش عندي بكرة").await;
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0[0].content.contains("\"وش عندي بكرة\""));
        assert!(prompts[0].0[0].content.contains("حذف_الكل"));
        assert_eq!(prompts[0].1, 0.0);
    }
}
