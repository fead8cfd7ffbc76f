//! Utterance input seam.
//!
//! The dialog loop asks for one utterance at a time and says whether it is
//! waiting for the wake word or inside an active session, so transcribing
//! sources can pick the matching recognizer hint. `Ok(None)` means the
//! input is exhausted and the loop should end.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, warn};

use crate::error::VoiceError;
use crate::transcription::{AudioInput, TranscriptionService};

/// What the dialog loop is listening for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// Idle, waiting for the wake word.
    Wake,
    /// Inside an active session.
    Dialog,
}

/// Produces transcribed utterances.
#[async_trait]
pub trait UtteranceSource: Send {
    async fn next_utterance(&mut self, mode: ListenMode) -> Result<Option<String>, VoiceError>;
}

/// Produces recorded utterances for transcription.
#[async_trait]
pub trait AudioSource: Send {
    async fn next_recording(&mut self, mode: ListenMode)
        -> Result<Option<AudioInput>, VoiceError>;
}

fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Reads typed utterances from stdin, one per line.
pub struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            lines: stdin_lines(),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UtteranceSource for StdinSource {
    async fn next_utterance(&mut self, _mode: ListenMode) -> Result<Option<String>, VoiceError> {
        self.lines
            .next_line()
            .await
            .map_err(|e| VoiceError::Input(e.to_string()))
    }
}

/// Reads paths of recorded WAV files from stdin, one per line.
pub struct StdinAudioPaths {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinAudioPaths {
    pub fn new() -> Self {
        Self {
            lines: stdin_lines(),
        }
    }
}

impl Default for StdinAudioPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSource for StdinAudioPaths {
    async fn next_recording(
        &mut self,
        _mode: ListenMode,
    ) -> Result<Option<AudioInput>, VoiceError> {
        let line = self
            .lines
            .next_line()
            .await
            .map_err(|e| VoiceError::Input(e.to_string()))?;
        Ok(line.map(|l| AudioInput::File(PathBuf::from(l.trim()))))
    }
}

// ---------------------------------------------------------------------------
// Transcribed
// ---------------------------------------------------------------------------

/// Transcribes recordings from an [`AudioSource`].
///
/// A failed transcription yields an empty utterance, which the dialog loop
/// ignores like silence.
pub struct TranscribedSource<A> {
    audio: A,
    stt: Arc<dyn TranscriptionService>,
    language: String,
    wake_prompt: String,
    dialog_prompt: String,
}

impl<A: AudioSource> TranscribedSource<A> {
    pub fn new(
        audio: A,
        stt: Arc<dyn TranscriptionService>,
        language: impl Into<String>,
        wake_prompt: impl Into<String>,
        dialog_prompt: impl Into<String>,
    ) -> Self {
        Self {
            audio,
            stt,
            language: language.into(),
            wake_prompt: wake_prompt.into(),
            dialog_prompt: dialog_prompt.into(),
        }
    }

    fn prompt(&self, mode: ListenMode) -> &str {
        match mode {
            ListenMode::Wake => &self.wake_prompt,
            ListenMode::Dialog => &self.dialog_prompt,
        }
    }
}

#[async_trait]
impl<A: AudioSource> UtteranceSource for TranscribedSource<A> {
    async fn next_utterance(&mut self, mode: ListenMode) -> Result<Option<String>, VoiceError> {
        let Some(recording) = self.audio.next_recording(mode).await? else {
            return Ok(None);
        };

        match self
            .stt
            .transcribe(recording, &self.language, self.prompt(mode))
            .await
        {
            Ok(text) => {
                debug!(?mode, transcript = %text, "Utterance transcribed");
                Ok(Some(text))
            }
            Err(e) => {
                warn!(error = %e, "Transcription failed, treating as silence");
                Ok(Some(String::new()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum ScriptStep {
    Say(String),
    Pause(Duration),
}

/// Replays a fixed conversation. Used by tests.
///
/// Pauses sleep on the tokio clock, so paused-time tests can drive session
/// timeouts. When the script runs out the source either ends the input or,
/// with [`hang_when_done`](Self::hang_when_done), never answers again.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    hang_when_done: bool,
    modes: Vec<ListenMode>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.steps.push_back(ScriptStep::Say(text.into()));
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.steps.push_back(ScriptStep::Pause(duration));
        self
    }

    pub fn hang_when_done(mut self) -> Self {
        self.hang_when_done = true;
        self
    }

    /// The mode of every request made so far.
    pub fn modes(&self) -> &[ListenMode] {
        &self.modes
    }
}

#[async_trait]
impl UtteranceSource for ScriptedSource {
    async fn next_utterance(&mut self, mode: ListenMode) -> Result<Option<String>, VoiceError> {
        self.modes.push(mode);
        loop {
            match self.steps.pop_front() {
                Some(ScriptStep::Say(text)) => return Ok(Some(text)),
                Some(ScriptStep::Pause(d)) => tokio::time::sleep(d).await,
                None if self.hang_when_done => std::future::pending::<()>().await,
                None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct QueuedAudio(VecDeque<AudioInput>);

    #[async_trait]
    impl AudioSource for QueuedAudio {
        async fn next_recording(
            &mut self,
            _mode: ListenMode,
        ) -> Result<Option<AudioInput>, VoiceError> {
            Ok(self.0.pop_front())
        }
    }

    #[derive(Default)]
    struct EchoStt {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TranscriptionService for EchoStt {
        async fn transcribe(
            &self,
            audio: AudioInput,
            language: &str,
            prompt: &str,
        ) -> Result<String, VoiceError> {
            assert_eq!(language, "ar");
            self.prompts.lock().unwrap().push(prompt.to_string());
            match audio {
                AudioInput::Bytes(b) if b.is_empty() => {
                    Err(VoiceError::Transcription("no audio".to_string()))
                }
                AudioInput::Bytes(b) => Ok(String::from_utf8(b).unwrap()),
                AudioInput::File(p) => Ok(p.display().to_string()),
            }
        }
    }

    #[tokio::test]
    async fn test_transcribed_source_uses_mode_prompt() {
        let stt = Arc::new(EchoStt::default());
        let audio = QueuedAudio(VecDeque::from(vec![
            AudioInput::Bytes("لبيب".as_bytes().to_vec()),
            AudioInput::Bytes("وش عندي".as_bytes().to_vec()),
        ]));
        let mut source = TranscribedSource::new(audio, stt.clone(), "ar", "wake", "dialog");

        assert_eq!(
            source.next_utterance(ListenMode::Wake).await.unwrap(),
            Some("لبيب".to_string())
        );
        assert_eq!(
            source.next_utterance(ListenMode::Dialog).await.unwrap(),
            Some("وش عندي".to_string())
        );
        assert_eq!(source.next_utterance(ListenMode::Dialog).await.unwrap(), None);
        assert_eq!(*stt.prompts.lock().unwrap(), vec!["wake", "dialog"]);
    }

    #[tokio::test]
    async fn test_transcription_failure_is_empty_utterance() {
        let stt = Arc::new(EchoStt::default());
        let audio = QueuedAudio(VecDeque::from(vec![AudioInput::Bytes(Vec::new())]));
        let mut source = TranscribedSource::new(audio, stt, "ar", "wake", "dialog");
        assert_eq!(
            source.next_utterance(ListenMode::Dialog).await.unwrap(),
            Some(String::new())
        );
    }

    #[tokio::test]
    async fn test_scripted_source_replays_and_ends() {
        let mut source = ScriptedSource::new().say("لبيب").say("سجل موعد");
        assert_eq!(
            source.next_utterance(ListenMode::Wake).await.unwrap().as_deref(),
            Some("لبيب")
        );
        assert_eq!(
            source.next_utterance(ListenMode::Dialog).await.unwrap().as_deref(),
            Some("سجل موعد")
        );
        assert_eq!(source.next_utterance(ListenMode::Dialog).await.unwrap(), None);
        assert_eq!(
            source.modes(),
            &[ListenMode::Wake, ListenMode::Dialog, ListenMode::Dialog]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_pause_uses_tokio_clock() {
        let mut source = ScriptedSource::new()
            .pause(Duration::from_secs(90))
            .say("هلا");
        let started = tokio::time::Instant::now();
        source.next_utterance(ListenMode::Dialog).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_hang_never_answers() {
        let mut source = ScriptedSource::new().hang_when_done();
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            source.next_utterance(ListenMode::Dialog),
        )
        .await;
        assert!(res.is_err());
    }
}
