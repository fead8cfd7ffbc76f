//! The dialog session: one utterance in, one spoken response out.
//!
//! While Idle only the wake word is acted on. While Active each utterance is
//! filtered for noise, classified, and dispatched to the task store or the
//! responder. A pending delete-all confirmation takes every utterance until
//! it is answered. The loop in [`DialogSession::run`] applies the inactivity
//! timeout by bounding each wait for input.

use std::sync::Arc;
use std::time::Duration;

use labeeb_chat::{ConversationResponder, IntentClassifier};
use labeeb_core::config::{Phrases, SessionConfig};
use labeeb_core::text::has_close_marker;
use labeeb_core::{Intent, Task};
use labeeb_tasks::{DeleteOutcome, TaskStore};
use labeeb_voice::{ListenMode, Speaker, UtteranceSource};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::confirmation::{Confirmation, ConfirmationState};
use crate::error::DialogError;
use crate::state::{SessionPhase, SessionState};
use crate::wake::UtteranceFilter;

/// What one utterance led to.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Noise, or speech while Idle without the wake word.
    Ignored,
    /// The wake word opened a session.
    Woke,
    TaskAdded(Task),
    TaskNotAdded,
    /// Recall answered; `related` is the number of retrieved tasks.
    Recalled { related: usize, closed: bool },
    Delete(DeleteOutcome),
    DeleteFailed,
    /// The delete-all question was asked.
    ConfirmationRequested,
    /// The answer was neither yes nor no; still waiting.
    AwaitingConfirmation,
    AllDeleted,
    DeleteAllAborted,
    /// A conversational reply; `closed` when it ended the session.
    Replied { closed: bool },
}

/// Owns everything one conversation needs.
pub struct DialogSession {
    store: TaskStore,
    classifier: IntentClassifier,
    responder: ConversationResponder,
    speaker: Arc<dyn Speaker>,
    state: SessionState,
    filter: UtteranceFilter,
    config: SessionConfig,
    phrases: Phrases,
    pending: Option<Confirmation>,
}

impl DialogSession {
    pub fn new(
        store: TaskStore,
        classifier: IntentClassifier,
        responder: ConversationResponder,
        speaker: Arc<dyn Speaker>,
        config: &SessionConfig,
        phrases: &Phrases,
    ) -> Self {
        let state = SessionState::new();
        if config.start_active {
            // A fresh state is always Idle, so this cannot fail.
            let _ = state.activate(Instant::now());
        }
        Self {
            store,
            classifier,
            responder,
            speaker,
            state,
            filter: UtteranceFilter::from_config(config),
            config: config.clone(),
            phrases: phrases.clone(),
            pending: None,
        }
    }

    /// Shared handle to the session state.
    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    pub fn is_confirming(&self) -> bool {
        self.pending.is_some()
    }

    /// Read utterances from `source` until it is exhausted.
    ///
    /// Per-turn failures are spoken and logged and the loop carries on. Only
    /// a failing input source ends the loop with an error.
    pub async fn run<S>(&mut self, source: &mut S) -> Result<(), DialogError>
    where
        S: UtteranceSource + ?Sized,
    {
        info!(
            phase = %self.state.current(),
            timeout_secs = self.config.timeout_secs,
            "Dialog loop started"
        );

        loop {
            let listened_active = self.state.is_active();
            let next = if listened_active {
                let remaining = self.state.remaining(Instant::now(), self.timeout());
                match tokio::time::timeout(remaining, source.next_utterance(ListenMode::Dialog))
                    .await
                {
                    Ok(next) => next,
                    Err(_) => {
                        self.expire().await;
                        continue;
                    }
                }
            } else {
                source.next_utterance(ListenMode::Wake).await
            };

            let utterance = match next {
                Ok(Some(utterance)) => utterance,
                Ok(None) => {
                    info!("Input closed, leaving dialog loop");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "Utterance source failed");
                    return Err(e.into());
                }
            };

            // An utterance ready at the deadline still arrives after it.
            if listened_active && self.state.timed_out(Instant::now(), self.timeout()) {
                self.expire().await;
            }

            if let Err(e) = self.handle_utterance(&utterance).await {
                warn!(error = %e, %utterance, "Turn failed");
                self.say(&self.phrases.turn_failed).await;
            }
        }
    }

    /// Process one transcribed utterance.
    pub async fn handle_utterance(&mut self, utterance: &str) -> Result<TurnOutcome, DialogError> {
        if self.state.current() == SessionPhase::Idle {
            return self.handle_idle(utterance).await;
        }

        if self.filter.is_noise(utterance) {
            debug!(%utterance, "Ignoring filler or empty transcript");
            return Ok(TurnOutcome::Ignored);
        }

        let outcome = if self.pending.is_some() {
            self.answer_confirmation(utterance).await?
        } else {
            let intent = self.classifier.classify(utterance).await;
            info!(%intent, %utterance, "Dispatching utterance");
            self.dispatch(intent, utterance).await?
        };

        self.state.touch(Instant::now());
        Ok(outcome)
    }

    /// Close the session after inactivity, abandoning any open question.
    pub async fn expire(&mut self) {
        if !self.state.is_active() {
            return;
        }
        info!("Session timed out");
        if self.pending.take().is_some() {
            self.say(&self.phrases.delete_all_aborted).await;
        }
        if let Err(e) = self.state.deactivate(Instant::now()) {
            warn!(error = %e, "Session already idle at timeout");
        }
        self.say(&self.phrases.session_closed).await;
    }

    async fn handle_idle(&mut self, utterance: &str) -> Result<TurnOutcome, DialogError> {
        if !self.filter.is_wake(utterance) {
            debug!(%utterance, "No wake word, staying idle");
            return Ok(TurnOutcome::Ignored);
        }
        info!("Wake word detected");
        self.state.activate(Instant::now())?;
        self.say(&self.phrases.greeting).await;
        Ok(TurnOutcome::Woke)
    }

    async fn dispatch(&mut self, intent: Intent, utterance: &str) -> Result<TurnOutcome, DialogError> {
        match intent {
            Intent::Register => Ok(self.register(utterance).await),
            Intent::Recall => self.recall(utterance).await,
            Intent::Delete => Ok(self.delete(utterance).await),
            Intent::DeleteAll => {
                self.pending = Some(Confirmation::from_config(&self.config));
                self.say(&self.phrases.confirm_delete_all).await;
                Ok(TurnOutcome::ConfirmationRequested)
            }
            Intent::Chat => {
                let reply = self.responder.respond(utterance, &[]).await;
                let closed = self.speak_reply(&reply).await?;
                Ok(TurnOutcome::Replied { closed })
            }
        }
    }

    async fn register(&mut self, utterance: &str) -> TurnOutcome {
        match self.store.add(utterance).await {
            Ok(task) => {
                self.say(&self.phrases.task_added).await;
                TurnOutcome::TaskAdded(task)
            }
            Err(e) => {
                warn!(error = %e, "Failed to register task");
                self.say(&self.phrases.task_add_failed).await;
                TurnOutcome::TaskNotAdded
            }
        }
    }

    async fn recall(&mut self, utterance: &str) -> Result<TurnOutcome, DialogError> {
        let related = self.store.search(utterance, self.store.search_k()).await;
        if related.is_empty() {
            let spoken = if self.store.is_empty() {
                self.phrases.no_tasks.clone()
            } else {
                self.phrases
                    .current_tasks(self.store.tasks().iter().map(|t| t.text.as_str()))
            };
            self.say(&spoken).await;
            return Ok(TurnOutcome::Recalled {
                related: 0,
                closed: false,
            });
        }

        let reply = self.responder.respond(utterance, &related).await;
        let closed = self.speak_reply(&reply).await?;
        Ok(TurnOutcome::Recalled {
            related: related.len(),
            closed,
        })
    }

    async fn delete(&mut self, utterance: &str) -> TurnOutcome {
        let outcome = match self.store.delete(utterance).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Failed to delete task");
                self.say(&self.phrases.task_delete_failed).await;
                return TurnOutcome::DeleteFailed;
            }
        };

        let spoken = match &outcome {
            DeleteOutcome::Deleted(task) => self.phrases.task_deleted(&task.text),
            DeleteOutcome::Empty => self.phrases.no_tasks_to_delete.clone(),
            DeleteOutcome::NotUnderstood => self.phrases.delete_not_understood.clone(),
            DeleteOutcome::NoMatch => self.phrases.delete_no_match.clone(),
        };
        self.say(&spoken).await;
        TurnOutcome::Delete(outcome)
    }

    async fn answer_confirmation(&mut self, utterance: &str) -> Result<TurnOutcome, DialogError> {
        let state = match self.pending.as_mut() {
            Some(pending) => pending.answer(utterance),
            None => return Ok(TurnOutcome::Ignored),
        };

        match state {
            ConfirmationState::Awaiting => {
                debug!(%utterance, "Confirmation answer not understood, still waiting");
                Ok(TurnOutcome::AwaitingConfirmation)
            }
            ConfirmationState::Confirmed => {
                self.pending = None;
                self.store.clear_all()?;
                self.say(&self.phrases.all_deleted).await;
                Ok(TurnOutcome::AllDeleted)
            }
            ConfirmationState::Declined => {
                self.pending = None;
                info!("Delete-all declined");
                self.say(&self.phrases.delete_all_aborted).await;
                Ok(TurnOutcome::DeleteAllAborted)
            }
        }
    }

    /// Speak a generated reply and close the session if it carries the
    /// close marker. Returns whether the session closed.
    async fn speak_reply(&mut self, reply: &str) -> Result<bool, DialogError> {
        self.say(reply).await;
        if has_close_marker(reply) {
            info!("Reply closed the conversation");
            self.state.deactivate(Instant::now())?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Speech failures are logged and otherwise ignored.
    async fn say(&self, text: &str) {
        if let Err(e) = self.speaker.speak(text).await {
            warn!(error = %e, "Failed to speak");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labeeb_chat::ScriptedModel;
    use labeeb_core::config::TasksConfig;
    use labeeb_vector::MockEmbedding;
    use labeeb_voice::RecordingSpeaker;
    use tempfile::TempDir;

    struct Harness {
        session: DialogSession,
        classifier: Arc<ScriptedModel>,
        chat: Arc<ScriptedModel>,
        speaker: Arc<RecordingSpeaker>,
        _dir: TempDir,
    }

    fn harness(start_active: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(
            dir.path().join("tasks.json"),
            Arc::new(MockEmbedding::new()),
            &TasksConfig::default(),
        );
        let classifier = Arc::new(ScriptedModel::new());
        let chat = Arc::new(ScriptedModel::new());
        let speaker = Arc::new(RecordingSpeaker::new());
        let phrases = Phrases::default();
        let config = SessionConfig {
            start_active,
            ..SessionConfig::default()
        };
        let session = DialogSession::new(
            store,
            IntentClassifier::new(classifier.clone(), 0.0),
            ConversationResponder::new(chat.clone(), 0.6, &phrases),
            speaker.clone(),
            &config,
            &phrases,
        );
        Harness {
            session,
            classifier,
            chat,
            speaker,
            _dir: dir,
        }
    }

    fn phrases() -> Phrases {
        Phrases::default()
    }

    #[tokio::test]
    async fn test_idle_ignores_speech_without_wake_word() {
        let mut h = harness(false);
        let outcome = h.session.handle_utterance("سجل موعد بكرة").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Ignored);
        assert_eq!(h.classifier.calls(), 0);
        assert!(h.speaker.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_wake_word_greets_and_activates() {
        let mut h = harness(false);
        let outcome = h.session.handle_utterance("يا لبيب").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Woke);
        assert!(h.session.state().is_active());
        assert_eq!(h.speaker.spoken(), vec![phrases().greeting]);
    }

    #[tokio::test]
    async fn test_filler_is_ignored_without_classification() {
        let mut h = harness(true);
        assert_eq!(h.session.handle_utterance("اه").await.unwrap(), TurnOutcome::Ignored);
        assert_eq!(h.session.handle_utterance("").await.unwrap(), TurnOutcome::Ignored);
        assert_eq!(h.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_register_adds_task_and_confirms() {
        let mut h = harness(true);
        h.classifier.push(Ok("تسجيل".to_string()));

        let outcome = h.session.handle_utterance("عندي حفلة بكرة الساعة 6").await.unwrap();
        match outcome {
            TurnOutcome::TaskAdded(task) => assert_eq!(task.text, "عندي حفلة بكرة الساعة 6"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(h.session.store().len(), 1);
        assert_eq!(h.speaker.last(), Some(phrases().task_added));
    }

    #[tokio::test]
    async fn test_recall_without_tasks_says_none() {
        let mut h = harness(true);
        h.classifier.push(Ok("تذكير".to_string()));
        let outcome = h.session.handle_utterance("وش عندي").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Recalled {
                related: 0,
                closed: false
            }
        );
        assert_eq!(h.speaker.last(), Some(phrases().no_tasks));
        assert_eq!(h.chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_recall_with_tasks_uses_responder() {
        let mut h = harness(true);
        h.classifier.push(Ok("تسجيل".to_string()));
        h.session.handle_utterance("اجتماع مع الفريق").await.unwrap();

        h.classifier.push(Ok("تذكير".to_string()));
        h.chat.push(Ok("عندك اجتماع مع الفريق".to_string()));
        let outcome = h.session.handle_utterance("متى الاجتماع").await.unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Recalled {
                related: 1,
                closed: false
            }
        );
        assert_eq!(h.speaker.last(), Some("عندك اجتماع مع الفريق".to_string()));
        let prompts = h.chat.prompts();
        assert!(prompts[0].0[0].content.contains("- اجتماع مع الفريق"));
    }

    #[tokio::test]
    async fn test_delete_speaks_task_name() {
        let mut h = harness(true);
        h.classifier.push(Ok("تسجيل".to_string()));
        h.session.handle_utterance("اشتري حليب").await.unwrap();

        h.classifier.push(Ok("حذف".to_string()));
        let outcome = h.session.handle_utterance("احذف اخر مهمة").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Delete(DeleteOutcome::Deleted(_))));
        assert!(h.session.store().is_empty());
        assert_eq!(h.speaker.last(), Some(phrases().task_deleted("اشتري حليب")));
    }

    #[tokio::test]
    async fn test_delete_on_empty_store() {
        let mut h = harness(true);
        h.classifier.push(Ok("حذف".to_string()));
        let outcome = h.session.handle_utterance("احذف الموعد").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Delete(DeleteOutcome::Empty));
        assert_eq!(h.speaker.last(), Some(phrases().no_tasks_to_delete));
    }

    #[tokio::test]
    async fn test_delete_all_waits_for_yes() {
        let mut h = harness(true);
        h.classifier.push(Ok("تسجيل".to_string()));
        h.session.handle_utterance("موعد الطبيب").await.unwrap();

        let outcome = h.session.handle_utterance("احذف كل المهام").await.unwrap();
        assert_eq!(outcome, TurnOutcome::ConfirmationRequested);
        assert!(h.session.is_confirming());
        assert_eq!(h.speaker.last(), Some(phrases().confirm_delete_all));

        // Not an answer: nothing is classified, the question stays open.
        let calls = h.classifier.calls();
        let outcome = h.session.handle_utterance("سجل موعد جديد").await.unwrap();
        assert_eq!(outcome, TurnOutcome::AwaitingConfirmation);
        assert_eq!(h.classifier.calls(), calls);
        assert_eq!(h.session.store().len(), 1);

        let outcome = h.session.handle_utterance("نعم").await.unwrap();
        assert_eq!(outcome, TurnOutcome::AllDeleted);
        assert!(h.session.store().is_empty());
        assert!(!h.session.is_confirming());
        assert_eq!(h.speaker.last(), Some(phrases().all_deleted));
    }

    #[tokio::test]
    async fn test_delete_all_declined() {
        let mut h = harness(true);
        h.classifier.push(Ok("تسجيل".to_string()));
        h.session.handle_utterance("موعد الطبيب").await.unwrap();

        h.session.handle_utterance("احذف كل شي").await.unwrap();
        let outcome = h.session.handle_utterance("لا").await.unwrap();
        assert_eq!(outcome, TurnOutcome::DeleteAllAborted);
        assert_eq!(h.session.store().len(), 1);
        assert_eq!(h.speaker.last(), Some(phrases().delete_all_aborted));
    }

    #[tokio::test]
    async fn test_close_marker_returns_to_idle() {
        let mut h = harness(true);
        h.classifier.push(Ok("غير".to_string()));
        h.chat
            .push(Ok("الله يحفظك\n<close_conversation>".to_string()));

        let outcome = h.session.handle_utterance("خلاص شكرا").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Replied { closed: true });
        assert!(!h.session.state().is_active());
        assert_eq!(h.speaker.last(), Some("الله يحفظك".to_string()));
    }

    #[tokio::test]
    async fn test_farewell_closes_without_model() {
        let mut h = harness(true);
        h.classifier.push(Ok("غير".to_string()));
        let outcome = h.session.handle_utterance("مع السلامة").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Replied { closed: true });
        assert_eq!(h.chat.calls(), 0);
        assert_eq!(h.speaker.last(), Some(phrases().farewell));
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back_to_chat() {
        let mut h = harness(true);
        h.classifier.push(Err("503".to_string()));
        h.chat.push(Ok("هلا والله".to_string()));
        let outcome = h.session.handle_utterance("كيف حالك").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Replied { closed: false });
        assert_eq!(h.speaker.last(), Some("هلا والله".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_abandons_confirmation() {
        let mut h = harness(true);
        h.session.handle_utterance("احذف كل المهام").await.unwrap();
        h.session.expire().await;

        assert!(!h.session.is_confirming());
        assert!(!h.session.state().is_active());
        let spoken = h.speaker.spoken();
        assert_eq!(
            &spoken[spoken.len() - 2..],
            &[phrases().delete_all_aborted, phrases().session_closed]
        );
    }
}
