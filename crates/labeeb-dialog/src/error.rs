//! Error types for the dialog loop.

use labeeb_core::LabeebError;
use labeeb_tasks::TaskError;
use labeeb_voice::VoiceError;

use crate::state::SessionPhase;

/// Errors that end a turn (or, for input errors, the loop).
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionPhase,
        to: SessionPhase,
    },
    #[error("Task store error: {0}")]
    Task(#[from] TaskError),
    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),
    #[error("{0}")]
    Core(#[from] LabeebError),
}

impl From<DialogError> for LabeebError {
    fn from(err: DialogError) -> Self {
        match err {
            DialogError::Core(inner) => inner,
            other => LabeebError::Dialog(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let err = DialogError::InvalidTransition {
            from: SessionPhase::Idle,
            to: SessionPhase::Idle,
        };
        assert_eq!(err.to_string(), "Invalid session transition: Idle -> Idle");
    }

    #[test]
    fn test_into_labeeb_error() {
        let err: LabeebError = DialogError::Voice(VoiceError::Input("eof".to_string())).into();
        assert!(matches!(err, LabeebError::Dialog(_)));

        let err: LabeebError = DialogError::Core(LabeebError::Config("x".to_string())).into();
        assert!(matches!(err, LabeebError::Config(_)));
    }
}
