//! Cancellable playback of synthesized replies.
//!
//! Each reply is written to a single artifact file in the data directory and
//! played either by an external command (`aplay`, `afplay`, ...) or, when no
//! command is configured, by waiting out the clip's decoded duration. Only
//! one clip plays at a time: starting a new one signals the current one to
//! stop and waits for it before the artifact is overwritten.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::VoiceError;

/// Bytes per second assumed when a WAV header cannot be decoded
/// (24 kHz, 16-bit mono, the TTS default).
const FALLBACK_BYTES_PER_SEC: u64 = 48_000;

/// Size of a canonical WAV header.
const WAV_HEADER_LEN: usize = 44;

/// Whether a clip is currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Stopped,
}

struct ActivePlayback {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the single playback slot.
pub struct PlaybackController {
    artifact_path: PathBuf,
    command: Vec<String>,
    /// Serializes `play` so two callers never start clips concurrently.
    play_lock: tokio::sync::Mutex<()>,
    active: Mutex<Option<ActivePlayback>>,
    state: Arc<watch::Sender<PlaybackState>>,
}

impl PlaybackController {
    /// `command` is the player program and its leading arguments; the
    /// artifact path is appended. Empty means silent timed playback.
    pub fn new(artifact_path: impl Into<PathBuf>, command: Vec<String>) -> Self {
        let (state, _) = watch::channel(PlaybackState::Stopped);
        Self {
            artifact_path: artifact_path.into(),
            command,
            play_lock: tokio::sync::Mutex::new(()),
            active: Mutex::new(None),
            state: Arc::new(state),
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Thread-safe "currently speaking" query.
    pub fn is_speaking(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Stop whatever is playing, then start `wav`. Returns once the new clip
    /// has started; use [`wait`](Self::wait) to block until it ends.
    pub async fn play(&self, wav: Vec<u8>) -> Result<(), VoiceError> {
        let _guard = self.play_lock.lock().await;
        self.stop_current().await;

        if let Some(parent) = self.artifact_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.artifact_path, &wav).await?;

        let duration = wav_duration(&wav);
        debug!(
            path = %self.artifact_path.display(),
            duration_ms = duration.as_millis() as u64,
            "Starting playback"
        );

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.state.send_replace(PlaybackState::Playing);

        let handle = tokio::spawn(run_clip(
            self.artifact_path.clone(),
            self.command.clone(),
            duration,
            cancel_rx,
            Arc::clone(&self.state),
        ));

        let mut active = self
            .active
            .lock()
            .map_err(|e| VoiceError::Playback(format!("playback lock poisoned: {}", e)))?;
        *active = Some(ActivePlayback {
            cancel: cancel_tx,
            handle,
        });
        Ok(())
    }

    /// Signal the current clip to stop and wait until it has.
    pub async fn stop(&self) {
        let _guard = self.play_lock.lock().await;
        self.stop_current().await;
    }

    async fn stop_current(&self) {
        let current = match self.active.lock() {
            Ok(mut active) => active.take(),
            Err(e) => {
                warn!(error = %e, "Playback lock poisoned");
                None
            }
        };

        if let Some(playback) = current {
            // The clip may already have finished and dropped its receiver.
            let _ = playback.cancel.send(());
            if let Err(e) = playback.handle.await {
                warn!(error = %e, "Playback task ended abnormally");
            }
        }
        self.state.send_replace(PlaybackState::Stopped);
    }

    /// Wait until nothing is playing.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == PlaybackState::Stopped).await;
    }
}

async fn run_clip(
    path: PathBuf,
    command: Vec<String>,
    duration: Duration,
    mut cancel: oneshot::Receiver<()>,
    state: Arc<watch::Sender<PlaybackState>>,
) {
    match command.split_first() {
        Some((program, args)) => {
            let child = Command::new(program)
                .args(args)
                .arg(&path)
                .kill_on_drop(true)
                .spawn();
            match child {
                Ok(mut child) => {
                    tokio::select! {
                        status = child.wait() => match status {
                            Ok(s) if !s.success() => warn!(%s, "Player exited with failure"),
                            Err(e) => warn!(error = %e, "Player wait failed"),
                            Ok(_) => {}
                        },
                        _ = &mut cancel => {
                            info!("Playback interrupted");
                            if let Err(e) = child.kill().await {
                                warn!(error = %e, "Failed to kill player");
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, program = %program, "Failed to start player"),
            }
        }
        None => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = &mut cancel => info!("Playback interrupted"),
            }
        }
    }
    state.send_replace(PlaybackState::Stopped);
}

/// Decoded length of a WAV clip, estimated from its size when the header is
/// unreadable (streamed TTS output sometimes carries a placeholder length).
pub fn wav_duration(wav: &[u8]) -> Duration {
    match hound::WavReader::new(Cursor::new(wav)) {
        Ok(reader) if reader.spec().sample_rate > 0 && reader.duration() > 0 => {
            let rate = reader.spec().sample_rate as f64;
            Duration::from_secs_f64(reader.duration() as f64 / rate)
        }
        _ => {
            let payload = wav.len().saturating_sub(WAV_HEADER_LEN) as u64;
            Duration::from_millis(payload * 1000 / FALLBACK_BYTES_PER_SEC)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Silent mono WAV of `secs` seconds at 8 kHz.
    fn silent_wav(secs: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..(8000 * secs) {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_wav_duration_from_header() {
        assert_eq!(wav_duration(&silent_wav(2)), Duration::from_secs(2));
    }

    #[test]
    fn test_wav_duration_fallback_estimate() {
        let bogus = vec![0u8; WAV_HEADER_LEN + 48_000];
        assert_eq!(wav_duration(&bogus), Duration::from_secs(1));
        assert_eq!(wav_duration(&[]), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_writes_artifact_and_finishes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("response.wav");
        let controller = PlaybackController::new(&path, Vec::new());
        let wav = silent_wav(1);

        controller.play(wav.clone()).await.unwrap();
        assert!(controller.is_speaking());
        assert_eq!(std::fs::read(&path).unwrap(), wav);

        controller.wait().await;
        assert!(!controller.is_speaking());
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_playback() {
        let dir = tempdir().unwrap();
        let controller = PlaybackController::new(dir.path().join("r.wav"), Vec::new());

        controller.play(silent_wav(30)).await.unwrap();
        let started = tokio::time::Instant::now();
        controller.stop().await;

        assert!(!controller.is_speaking());
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_clip_replaces_current_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.wav");
        let controller = PlaybackController::new(&path, Vec::new());

        controller.play(silent_wav(30)).await.unwrap();
        let second = silent_wav(1);
        controller.play(second.clone()).await.unwrap();

        assert!(controller.is_speaking());
        assert_eq!(std::fs::read(&path).unwrap(), second);

        let started = tokio::time::Instant::now();
        controller.wait().await;
        assert!(started.elapsed() <= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let dir = tempdir().unwrap();
        let controller = PlaybackController::new(dir.path().join("r.wav"), Vec::new());
        controller.stop().await;
        controller.wait().await;
        assert!(!controller.is_speaking());
    }
}
