//! CLI argument definitions for the Labeeb binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Labeeb - a Saudi-dialect voice assistant that remembers your tasks.
#[derive(Parser, Debug)]
#[command(name = "labeeb", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for the task file and playback artifacts.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Speak replies through TTS and playback instead of printing them.
    #[arg(long = "voice")]
    pub voice: bool,

    /// Start with an open session instead of waiting for the wake word.
    #[arg(long = "no-wake")]
    pub no_wake: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > LABEEB_CONFIG env var > ~/.labeeb/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("LABEEB_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > LABEEB_DATA_DIR env var. `None` keeps the
    /// config file value.
    pub fn resolve_data_dir(&self) -> Option<String> {
        if let Some(ref p) = self.data_dir {
            return Some(p.to_string_lossy().to_string());
        }
        std::env::var("LABEEB_DATA_DIR")
            .ok()
            .filter(|p| !p.trim().is_empty())
    }

    /// Resolve the log level: --log-level flag > config value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".labeeb").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".labeeb").join("config.toml");
    }
    PathBuf::from("config.toml")
}
