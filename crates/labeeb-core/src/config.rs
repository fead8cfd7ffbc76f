use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LabeebError, Result};

/// Top-level configuration for the Labeeb assistant.
///
/// Loaded from `~/.labeeb/config.toml` by default. Each section corresponds
/// to a bounded context; spoken wording lives in `phrases` so prototype
/// variants differ by configuration only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabeebConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub phrases: Phrases,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub vision: VisionConfig,
}

impl LabeebConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LabeebConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LabeebError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Data directory with a leading `~/` expanded to the home directory.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Location of the persisted task list.
    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir().join(&self.tasks.file_name)
    }
}

/// Expand `~/` (or `~\` on Windows) to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the task file and playback artifacts.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.labeeb".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Dialog session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity after which an active session returns to idle.
    pub timeout_secs: u64,
    /// Accepted spellings and common mishearings of the wake word.
    pub wake_words: Vec<String>,
    /// Transcripts consisting only of one of these are treated as noise.
    pub filler_tokens: Vec<String>,
    /// Words accepted as "yes" in a confirmation prompt.
    pub yes_words: Vec<String>,
    /// Words accepted as "no" in a confirmation prompt.
    pub no_words: Vec<String>,
    /// Transcription language code.
    pub language: String,
    /// Transcription hint used while waiting for the wake word.
    pub wake_prompt: String,
    /// Transcription hint used inside an active session.
    pub dialog_prompt: String,
    /// Maximum length of one recorded utterance.
    pub max_utterance_secs: u32,
    /// Start with an open session instead of waiting for the wake word.
    pub start_active: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            wake_words: ["لبيب", "لبي", "لب", "يالبيب", "labeeb"]
                .into_iter()
                .map(String::from)
                .collect(),
            filler_tokens: ["اه", "ام", "مم", "اا", "مممم", "اهم", "اااا"]
                .into_iter()
                .map(String::from)
                .collect(),
            yes_words: ["نعم", "ايه", "اي", "yes"]
                .into_iter()
                .map(String::from)
                .collect(),
            no_words: ["لا", "no"].into_iter().map(String::from).collect(),
            language: "ar".to_string(),
            wake_prompt: "لبيب هو اسم الروبوت. الكلمات المتوقعة: لبيب".to_string(),
            dialog_prompt: "توقع كلام باللهجة السعودية".to_string(),
            max_utterance_secs: 10,
            start_active: false,
        }
    }
}

/// Task store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// File name of the persisted task list inside the data directory.
    pub file_name: String,
    /// Embedding dimension.
    pub embedding_dim: usize,
    /// Default number of semantic search results.
    pub search_k: usize,
    /// Half-width in days of the date-filter window.
    pub date_window_days: i64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            file_name: "tasks.json".to_string(),
            embedding_dim: crate::types::EMBEDDING_DIM,
            search_k: 5,
            date_window_days: 1,
        }
    }
}

/// OpenAI-compatible endpoint settings shared by every hosted collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub chat_model: String,
    pub classifier_model: String,
    pub embedding_model: String,
    pub stt_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_instructions: String,
    pub responder_temperature: f32,
    pub classifier_temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            chat_model: "gpt-4-1106-preview".to_string(),
            classifier_model: "gpt-4-1106-preview".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            tts_voice: "echo".to_string(),
            tts_instructions: "تكلم بلهجة سعودية نجدية واضحة، لا تغلط بالكلمات وخلك ذكي"
                .to_string(),
            responder_temperature: 0.6,
            classifier_temperature: 0.0,
            request_timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Every sentence the assistant speaks that is not model-generated.
///
/// `{task}` and `{tasks}` are substituted where noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Phrases {
    pub greeting: String,
    pub session_closed: String,
    pub task_added: String,
    pub task_add_failed: String,
    pub no_tasks_to_delete: String,
    pub delete_not_understood: String,
    pub delete_no_match: String,
    /// Uses `{task}`.
    pub task_deleted: String,
    pub task_delete_failed: String,
    pub confirm_delete_all: String,
    pub all_deleted: String,
    pub delete_all_aborted: String,
    /// Uses `{tasks}`.
    pub current_tasks: String,
    pub no_tasks: String,
    pub no_context: String,
    pub farewell: String,
    pub reply_failed: String,
    pub turn_failed: String,
}

impl Default for Phrases {
    fn default() -> Self {
        Self {
            greeting: "نعم، كيف اقدر اخدمك؟".to_string(),
            session_closed: "تم إنهاء الجلسة، ناديني إذا احتجتني!".to_string(),
            task_added: "تم تسجيل المهمة يا بطل!".to_string(),
            task_add_failed: "حصل خطأ في تسجيل المهمة".to_string(),
            no_tasks_to_delete: "ما عندك مهام عشان أحذفها.".to_string(),
            delete_not_understood: "ما فهمت المهمة اللي تبي تحذفها.".to_string(),
            delete_no_match: "ما لقيت مهمة قريبة من اللي قلتها.".to_string(),
            task_deleted: "تمام، حذفت لك مهمة: {task}.".to_string(),
            task_delete_failed: "حصل خطأ في حذف المهمة.".to_string(),
            confirm_delete_all: "متأكد تبيني أحذف كل المهام؟ قل نعم أو لا.".to_string(),
            all_deleted: "تمام، مسحت كل المهام.".to_string(),
            delete_all_aborted: "ما صار شيء، ما مسحت ولا مهمة.".to_string(),
            current_tasks: "مهامك الحالية هي: {tasks}".to_string(),
            no_tasks: "ما عندك مهام مسجلة حالياً.".to_string(),
            no_context: "ما عندك مهام مسجلة يا حلو.".to_string(),
            farewell: "الله يحفظك، ناديني إذا احتجتني!".to_string(),
            reply_failed: "حصل خطأ في الرد".to_string(),
            turn_failed: "حصل خطأ، بس راح أكمل شغل".to_string(),
        }
    }
}

impl Phrases {
    pub fn task_deleted(&self, task_text: &str) -> String {
        self.task_deleted.replace("{task}", task_text)
    }

    pub fn current_tasks<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> String {
        let joined = texts.into_iter().collect::<Vec<_>>().join("، ");
        self.current_tasks.replace("{tasks}", &joined)
    }
}

/// Spoken output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Synthesize replies instead of printing them.
    pub enabled: bool,
    /// File name of the last synthesized reply inside the data directory.
    pub artifact_name: String,
    /// External player invoked with the artifact path appended, e.g.
    /// `["aplay", "-q"]`. Empty waits out the clip duration silently.
    pub playback_command: Vec<String>,
    /// Each console line is a path to a recorded utterance to transcribe.
    pub transcribe_input: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            artifact_name: "response.wav".to_string(),
            playback_command: Vec::new(),
            transcribe_input: false,
        }
    }
}

/// Background phone-use watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub enabled: bool,
    /// Continuous seconds a phone must be held before the warning.
    pub phone_hold_secs: u64,
    /// Delay between detector polls.
    pub poll_interval_ms: u64,
    pub warning_text: String,
    /// Detector endpoint answering `{"people": [...], "phones": [...]}`.
    pub detector_url: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            phone_hold_secs: 10,
            poll_interval_ms: 100,
            warning_text: "لو سمحت لاتستخدم الجوال في الشغل".to_string(),
            detector_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = LabeebConfig::default();
        assert_eq!(config.session.timeout_secs, 60);
        assert_eq!(config.tasks.embedding_dim, 384);
        assert_eq!(config.tasks.search_k, 5);
        assert_eq!(config.tasks.date_window_days, 1);
        assert_eq!(config.tasks.file_name, "tasks.json");
        assert!(config.session.wake_words.iter().any(|w| w == "لبيب"));
        assert!((config.openai.responder_temperature - 0.6).abs() < f32::EPSILON);
        assert!(!config.vision.enabled);
        assert!(!config.voice.enabled);
        assert_eq!(config.voice.artifact_name, "response.wav");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = LabeebConfig::default();
        config.session.timeout_secs = 90;
        config.phrases.greeting = "هلا".to_string();
        config.save(&path).unwrap();

        let loaded = LabeebConfig::load(&path).unwrap();
        assert_eq!(loaded.session.timeout_secs, 90);
        assert_eq!(loaded.phrases.greeting, "هلا");
        assert_eq!(loaded.tasks.search_k, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\ntimeout_secs = 30\n").unwrap();

        let loaded = LabeebConfig::load(&path).unwrap();
        assert_eq!(loaded.session.timeout_secs, 30);
        assert_eq!(loaded.session.language, "ar");
        assert_eq!(loaded.openai.stt_model, "whisper-1");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = LabeebConfig::load_or_default(Path::new("/nonexistent/labeeb.toml"));
        assert_eq!(config.session.timeout_secs, 60);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = [[[").unwrap();
        assert!(matches!(
            LabeebConfig::load(&path),
            Err(LabeebError::Config(_))
        ));
    }

    #[test]
    fn test_phrase_substitution() {
        let phrases = Phrases::default();
        assert_eq!(phrases.task_deleted("موعد"), "تمام، حذفت لك مهمة: موعد.");
        assert_eq!(
            phrases.current_tasks(["أ", "ب"]),
            "مهامك الحالية هي: أ، ب"
        );
    }

    #[test]
    fn test_expand_home_plain_path() {
        assert_eq!(expand_home("/var/labeeb"), PathBuf::from("/var/labeeb"));
    }

    #[test]
    fn test_tasks_path_joins_file_name() {
        let mut config = LabeebConfig::default();
        config.general.data_dir = "/tmp/labeeb".to_string();
        assert_eq!(config.tasks_path(), PathBuf::from("/tmp/labeeb/tasks.json"));
    }
}
