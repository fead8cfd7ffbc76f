//! Spoken output seam.
//!
//! Every implementation strips the close-conversation marker before the
//! text reaches the user; text that is empty afterwards is not spoken.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use labeeb_core::text::strip_close_marker;
use tracing::{debug, info};

use crate::error::VoiceError;
use crate::playback::PlaybackController;
use crate::synthesis::SpeechSynthesizer;

/// Says things to the user.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), VoiceError>;
}

/// Prints replies to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleSpeaker {
    name: String,
}

impl ConsoleSpeaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ConsoleSpeaker {
    fn default() -> Self {
        Self::new("لبيب")
    }
}

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        let text = strip_close_marker(text);
        if text.is_empty() {
            return Ok(());
        }
        info!(reply = %text, "Speaking");
        println!("{}: {}", self.name, text);
        Ok(())
    }
}

/// Synthesizes replies and plays them, waiting until playback ends.
pub struct VoiceSpeaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: Arc<PlaybackController>,
}

impl VoiceSpeaker {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, playback: Arc<PlaybackController>) -> Self {
        Self {
            synthesizer,
            playback,
        }
    }

    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.playback
    }
}

#[async_trait]
impl Speaker for VoiceSpeaker {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        let text = strip_close_marker(text);
        if text.is_empty() {
            return Ok(());
        }
        info!(reply = %text, "Speaking");
        let wav = self.synthesizer.synthesize(&text).await?;
        self.playback.play(wav).await?;
        self.playback.wait().await;
        debug!("Playback finished");
        Ok(())
    }
}

/// Records everything it is asked to say. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far, marker already stripped.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.spoken().pop()
    }

    pub fn clear(&self) {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.clear();
        }
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        let text = strip_close_marker(text);
        if text.is_empty() {
            return Ok(());
        }
        self.spoken
            .lock()
            .map_err(|e| VoiceError::Playback(format!("recorder lock poisoned: {}", e)))?
            .push(text);
        Ok(())
    }
}
