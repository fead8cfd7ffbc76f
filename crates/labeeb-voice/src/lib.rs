//! Labeeb Voice crate - speech in and out.
//!
//! Provides the transcription and speech-synthesis collaborators (OpenAI
//! Whisper and TTS), the cancellable [`PlaybackController`], and the two
//! seams the dialog loop is written against: [`Speaker`] for output and
//! [`UtteranceSource`] for input. Microphone capture stays outside this
//! crate; recorded audio enters through [`AudioSource`].

pub mod error;
pub mod input;
pub mod playback;
pub mod speaker;
pub mod synthesis;
pub mod transcription;

pub use error::VoiceError;
pub use input::{
    AudioSource, ListenMode, ScriptedSource, StdinAudioPaths, StdinSource, TranscribedSource,
    UtteranceSource,
};
pub use playback::{PlaybackController, PlaybackState};
pub use speaker::{ConsoleSpeaker, RecordingSpeaker, Speaker, VoiceSpeaker};
pub use synthesis::{OpenAiSpeech, SpeechSynthesizer};
pub use transcription::{AudioInput, OpenAiTranscription, TranscriptionService};
