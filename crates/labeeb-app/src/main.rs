//! Labeeb application binary - composition root.
//!
//! 1. Resolve configuration (CLI > env > TOML file > defaults)
//! 2. Initialize logging
//! 3. Build the hosted collaborators, falling back to offline stand-ins when
//!    no API key is available
//! 4. Load the task store
//! 5. Start the phone watch in the background when enabled
//! 6. Run the dialog loop on stdin until input ends or Ctrl-C

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use labeeb_chat::{ConversationResponder, IntentClassifier, LanguageModel, OpenAiChat, UnavailableModel};
use labeeb_core::config::{LabeebConfig, OpenAiConfig};
use labeeb_dialog::DialogSession;
use labeeb_tasks::TaskStore;
use labeeb_vector::{DynEmbeddingService, MockEmbedding, OpenAiEmbedding};
use labeeb_vision::{run_phone_watch, HttpDetector};
use labeeb_voice::{
    ConsoleSpeaker, OpenAiSpeech, OpenAiTranscription, PlaybackController, Speaker,
    StdinAudioPaths, StdinSource, TranscribedSource, UtteranceSource, VoiceSpeaker,
};

use cli::CliArgs;

fn language_model(config: &OpenAiConfig, model: &str, role: &str) -> Arc<dyn LanguageModel> {
    match OpenAiChat::from_config(config, model) {
        Ok(chat) => {
            tracing::info!(role, model, "Language model ready");
            Arc::new(chat)
        }
        Err(e) => {
            tracing::warn!(role, error = %e, "Language model unavailable, using fallbacks");
            Arc::new(UnavailableModel::new(e.to_string()))
        }
    }
}

fn embedder(config: &LabeebConfig) -> Arc<dyn DynEmbeddingService> {
    match OpenAiEmbedding::from_config(&config.openai, config.tasks.embedding_dim) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::warn!(error = %e, "Embedding endpoint unavailable, using offline mock embeddings");
            Arc::new(MockEmbedding::new())
        }
    }
}

fn speaker(config: &LabeebConfig, data_dir: &Path) -> Arc<dyn Speaker> {
    if !config.voice.enabled {
        return Arc::new(ConsoleSpeaker::default());
    }
    match OpenAiSpeech::from_config(&config.openai) {
        Ok(tts) => {
            let playback = PlaybackController::new(
                data_dir.join(&config.voice.artifact_name),
                config.voice.playback_command.clone(),
            );
            tracing::info!(voice = %config.openai.tts_voice, "Voice output enabled");
            Arc::new(VoiceSpeaker::new(Arc::new(tts), Arc::new(playback)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Speech synthesis unavailable, printing replies");
            Arc::new(ConsoleSpeaker::default())
        }
    }
}

fn utterance_source(config: &LabeebConfig) -> Box<dyn UtteranceSource> {
    if !config.voice.transcribe_input {
        return Box::new(StdinSource::new());
    }
    match OpenAiTranscription::from_config(&config.openai) {
        Ok(stt) => {
            tracing::info!(model = %config.openai.stt_model, "Reading recording paths from stdin");
            Box::new(TranscribedSource::new(
                StdinAudioPaths::new(),
                Arc::new(stt),
                config.session.language.clone(),
                config.session.wake_prompt.clone(),
                config.session.dialog_prompt.clone(),
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Transcription unavailable, reading typed utterances");
            Box::new(StdinSource::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before logging starts so its log level applies.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        Some(LabeebConfig::load(&config_file))
    } else {
        None
    };
    let mut config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => LabeebConfig::default(),
    };

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Labeeb v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Some(Ok(_)) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(Err(e)) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load configuration, using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "No configuration file, using defaults"),
    }

    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if args.voice {
        config.voice.enabled = true;
    }
    if args.no_wake {
        config.session.start_active = true;
    }

    let data_dir = config.data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    // Task memory.
    let mut store = TaskStore::new(config.tasks_path(), embedder(&config), &config.tasks);
    let report = store.load().await?;
    tracing::info!(
        path = %config.tasks_path().display(),
        tasks = report.loaded,
        "Task memory ready"
    );

    // Chat components.
    let classifier = IntentClassifier::new(
        language_model(&config.openai, &config.openai.classifier_model, "classifier"),
        config.openai.classifier_temperature,
    );
    let responder = ConversationResponder::new(
        language_model(&config.openai, &config.openai.chat_model, "responder"),
        config.openai.responder_temperature,
        &config.phrases,
    );

    let speaker = speaker(&config, &data_dir);

    // Phone watch.
    let vision_task = if config.vision.enabled {
        match config.vision.detector_url.as_deref() {
            Some(url) => {
                let timeout = Duration::from_secs(config.openai.request_timeout_secs);
                let detector = HttpDetector::new(url, timeout)?;
                let speaker = Arc::clone(&speaker);
                let vision = config.vision.clone();
                Some(tokio::spawn(async move {
                    run_phone_watch(Arc::new(detector), speaker, vision).await;
                }))
            }
            None => {
                tracing::warn!("Vision enabled but no detector_url configured, phone watch disabled");
                None
            }
        }
    } else {
        None
    };

    // Dialog loop.
    let mut source = utterance_source(&config);
    let mut session = DialogSession::new(
        store,
        classifier,
        responder,
        speaker,
        &config.session,
        &config.phrases,
    );

    if config.session.start_active {
        tracing::info!("Session open, speak or type a request");
    } else {
        tracing::info!(wake_words = ?config.session.wake_words, "Waiting for the wake word");
    }

    let result = tokio::select! {
        res = session.run(source.as_mut()) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    };

    if let Some(handle) = vision_task {
        handle.abort();
    }

    result?;
    tracing::info!("Labeeb stopped");
    Ok(())
}
