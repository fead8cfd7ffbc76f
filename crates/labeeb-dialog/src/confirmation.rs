//! Yes/no confirmation sub-dialog.
//!
//! Once asked, the question stays open until an answer starts with an
//! accepted "yes" or "no" word. Nothing else is processed meanwhile.

use labeeb_core::config::SessionConfig;
use labeeb_core::text::{normalize, words};

/// Where a pending confirmation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    Awaiting,
    Confirmed,
    Declined,
}

/// One pending yes/no question.
#[derive(Debug, Clone)]
pub struct Confirmation {
    yes: Vec<String>,
    no: Vec<String>,
    state: ConfirmationState,
}

impl Confirmation {
    pub fn new<Y, N>(yes: Y, no: N) -> Self
    where
        Y: IntoIterator,
        Y::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            yes: yes.into_iter().map(|w| normalize(w.as_ref())).collect(),
            no: no.into_iter().map(|w| normalize(w.as_ref())).collect(),
            state: ConfirmationState::Awaiting,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.yes_words, &config.no_words)
    }

    pub fn state(&self) -> ConfirmationState {
        self.state
    }

    /// Feed one answer. A resolved confirmation ignores further answers.
    pub fn answer(&mut self, utterance: &str) -> ConfirmationState {
        if self.state != ConfirmationState::Awaiting {
            return self.state;
        }
        let normalized = normalize(utterance);
        if let Some(first) = words(&normalized).next() {
            if self.yes.iter().any(|w| w == first) {
                self.state = ConfirmationState::Confirmed;
            } else if self.no.iter().any(|w| w == first) {
                self.state = ConfirmationState::Declined;
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation() -> Confirmation {
        Confirmation::from_config(&SessionConfig::default())
    }

    #[test]
    fn test_yes() {
        let mut c = confirmation();
        assert_eq!(c.answer("نعم"), ConfirmationState::Confirmed);
        let mut c = confirmation();
        assert_eq!(c.answer("ايه، احذفها"), ConfirmationState::Confirmed);
    }

    #[test]
    fn test_no() {
        let mut c = confirmation();
        assert_eq!(c.answer("لا."), ConfirmationState::Declined);
    }

    #[test]
    fn test_unrecognized_keeps_waiting() {
        let mut c = confirmation();
        assert_eq!(c.answer("وش قلت؟"), ConfirmationState::Awaiting);
        assert_eq!(c.answer(""), ConfirmationState::Awaiting);
        assert_eq!(c.answer("لا"), ConfirmationState::Declined);
    }

    #[test]
    fn test_resolved_ignores_later_answers() {
        let mut c = confirmation();
        c.answer("no");
        assert_eq!(c.answer("yes"), ConfirmationState::Declined);
        assert_eq!(c.state(), ConfirmationState::Declined);
    }
}
