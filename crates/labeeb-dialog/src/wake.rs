//! Wake-word and noise filtering of transcripts.

use labeeb_core::config::SessionConfig;
use labeeb_core::text::{normalize, words};

/// Decides which transcripts wake the assistant and which are noise.
///
/// Matching is word-level on normalized text so short spellings such as
/// "لب" do not fire inside unrelated words.
#[derive(Debug, Clone)]
pub struct UtteranceFilter {
    wake_words: Vec<String>,
    fillers: Vec<String>,
}

impl UtteranceFilter {
    pub fn new<W, F>(wake_words: W, fillers: F) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Self {
            wake_words: wake_words.into_iter().map(|w| normalize(w.as_ref())).collect(),
            fillers: fillers.into_iter().map(|f| normalize(f.as_ref())).collect(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.wake_words, &config.filler_tokens)
    }

    /// Whether any word of the utterance is an accepted wake-word spelling.
    pub fn is_wake(&self, utterance: &str) -> bool {
        let normalized = normalize(utterance);
        let hit = words(&normalized).any(|w| self.wake_words.iter().any(|k| k == w));
        hit
    }

    /// Empty transcripts and lone filler sounds.
    pub fn is_noise(&self, utterance: &str) -> bool {
        let normalized = normalize(utterance);
        let mut ws = words(&normalized);
        match (ws.next(), ws.next()) {
            (None, _) => true,
            (Some(only), None) => self.fillers.iter().any(|f| f == only),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> UtteranceFilter {
        UtteranceFilter::from_config(&SessionConfig::default())
    }

    #[test]
    fn test_wake_word_spellings() {
        let f = filter();
        assert!(f.is_wake("لبيب"));
        assert!(f.is_wake("يا لبيب، وش عندي؟"));
        assert!(f.is_wake("يالبيب"));
        assert!(f.is_wake("Labeeb!"));
        assert!(f.is_wake("لب"));
    }

    #[test]
    fn test_wake_word_must_be_whole_word() {
        let f = filter();
        assert!(!f.is_wake("طلبت قهوة"));
        assert!(!f.is_wake("قلب"));
        assert!(!f.is_wake(""));
    }

    #[test]
    fn test_noise() {
        let f = filter();
        assert!(f.is_noise(""));
        assert!(f.is_noise("   "));
        assert!(f.is_noise("مم"));
        assert!(f.is_noise("اه."));
        assert!(f.is_noise("أه"));
        assert!(!f.is_noise("اه سجل موعد"));
        assert!(!f.is_noise("بكرة"));
    }
}
