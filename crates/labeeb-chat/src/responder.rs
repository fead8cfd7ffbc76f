//! Conversational replies grounded in the user's tasks.
//!
//! Farewells are answered locally with the close-conversation marker
//! appended. Everything else goes to the language model with the related
//! tasks as context; the model is told to append the marker itself when the
//! user is ending the conversation.

use std::sync::Arc;

use labeeb_core::config::Phrases;
use labeeb_core::text::normalize;
use labeeb_core::{Task, CLOSE_CONVERSATION};
use tracing::{debug, warn};

use crate::llm::{ChatMessage, LanguageModel};

/// Normalized phrases that end the conversation without a model call.
const FAREWELL_KEYWORDS: &[&str] = &[
    "مع السلامه",
    "في امان الله",
    "ما عاد ابي اتكلم",
    "باي",
    "bye",
    "goodbye",
];

/// Produces the spoken reply for recall and chat turns.
pub struct ConversationResponder {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
    farewell: String,
    apology: String,
    no_context: String,
}

impl ConversationResponder {
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32, phrases: &Phrases) -> Self {
        Self {
            model,
            temperature,
            farewell: phrases.farewell.clone(),
            apology: phrases.reply_failed.clone(),
            no_context: phrases.no_context.clone(),
        }
    }

    /// Reply to `utterance` given the tasks retrieved for it.
    ///
    /// The result may carry [`CLOSE_CONVERSATION`]; it is never an error.
    pub async fn respond(&self, utterance: &str, related: &[Task]) -> String {
        if is_farewell(utterance) {
            debug!("Farewell detected, closing without a model call");
            return format!("{}\n{}", self.farewell, CLOSE_CONVERSATION);
        }

        let prompt = [ChatMessage::user(self.build_prompt(utterance, related))];
        match self.model.complete(&prompt, self.temperature).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Reply generation failed, using apology");
                self.apology.clone()
            }
        }
    }

    fn build_prompt(&self, utterance: &str, related: &[Task]) -> String {
        let context = if related.is_empty() {
            self.no_context.clone()
        } else {
            related
                .iter()
                .map(|t| {
                    format!(
                        "- {} (موعد: {})",
                        t.text,
                        t.scheduled_time.format("%Y-%m-%d %H:%M")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "أنت مساعد شخصي باللهجة السعودية، هدفك هو الرد باختصار وبشكل طبيعي ومرح على المستخدم.\n\n\
             لو شعرت أن المستخدم يقصد إنهاء المحادثة (زي أنه يقول: خلاص، شكراً، مع السلامة، ما عاد أبي أتكلم)، \
             رد بشكل مهذب برسالة وداع، وارجع لي السطر:\n\n\
             {CLOSE_CONVERSATION}\n\n\
             وإذا ما كان ينهي، فقط رد طبيعي من دون هذا السطر.\n\n\
             السياق:\n{context}\n\n\
             المستخدم قال: {utterance}\n\n\
             رد:\n"
        )
    }
}

/// Whether the utterance contains an explicit farewell.
pub fn is_farewell(utterance: &str) -> bool {
    let normalized = normalize(utterance);
    FAREWELL_KEYWORDS.iter().any(|k| {
        // Short latin/arabic words must stand alone ("باي" inside "بايع" is not a farewell).
        if k.chars().count() <= 3 {
            labeeb_core::text::words(&normalized).any(|w| w == *k)
        } else {
            normalized.contains(k)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use chrono::NaiveDate;
    use labeeb_core::text::has_close_marker;

    fn responder(model: ScriptedModel) -> (ConversationResponder, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        (
            ConversationResponder::new(model.clone(), 0.6, &Phrases::default()),
            model,
        )
    }

    fn task(text: &str) -> Task {
        let at = NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        Task::new(text, at)
    }

    #[tokio::test]
    async fn test_reply_passes_through() {
        let (r, _) = responder(ScriptedModel::new().reply("عندك حفلة بكرة"));
        assert_eq!(r.respond("وش عندي", &[]).await, "عندك حفلة بكرة");
    }

    #[tokio::test]
    async fn test_prompt_lists_related_tasks_with_time() {
        let (r, model) = responder(ScriptedModel::new().reply("تمام"));
        r.respond("وش عندي بكرة", &[task("حفلة عيد ميلاد"), task("اشتري كيك")])
            .await;

        let prompts = model.prompts();
        let (messages, temperature) = &prompts[0];
        let prompt = &messages[0].content;
        assert!(prompt.contains("- حفلة عيد ميلاد (موعد: 2026-10-15 18:00)"));
        assert!(prompt.contains("- اشتري كيك (موعد: 2026-10-15 18:00)"));
        assert!(prompt.contains("المستخدم قال: وش عندي بكرة"));
        assert!(prompt.contains(CLOSE_CONVERSATION));
        assert!((temperature - 0.6).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_prompt_without_tasks_uses_no_context_phrase() {
        let (r, model) = responder(ScriptedModel::new().reply("هلا"));
        r.respond("كيف حالك", &[]).await;
        let prompts = model.prompts();
        let prompt = &prompts[0].0[0].content;
        assert!(prompt.contains(&Phrases::default().no_context));
    }

    #[tokio::test]
    async fn test_farewell_fast_path() {
        let (r, model) = responder(ScriptedModel::new());
        let reply = r.respond("شكرا، مع السلامة", &[]).await;
        assert!(has_close_marker(&reply));
        assert!(reply.starts_with(&Phrases::default().farewell));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_close_marker_is_preserved() {
        let (r, _) = responder(ScriptedModel::new().reply("الله يحفظك\n<close_conversation>"));
        let reply = r.respond("خلاص شكرا", &[]).await;
        assert!(has_close_marker(&reply));
    }

    #[tokio::test]
    async fn test_failure_returns_apology() {
        let (r, _) = responder(ScriptedModel::new().fail("503"));
        assert_eq!(r.respond("كيف حالك", &[]).await, "حصل خطأ في الرد");
    }

    #[test]
    fn test_is_farewell() {
        assert!(is_farewell("مع السلامة"));
        assert!(is_farewell("يلا باي"));
        assert!(is_farewell("OK bye!"));
        assert!(is_farewell("ما عاد أبي أتكلم"));
        assert!(!is_farewell("بايع السيارة"));
        assert!(!is_farewell("وش عندي بكرة"));
    }
}
