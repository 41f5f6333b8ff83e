//! Main settings module

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    ChunkingConfig, ConfigError, HighlightConfig, PlaybackConfig, SimulationConfig, TextConfig,
    VoiceConfig,
};

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Text cleaning
    #[serde(default)]
    pub text: TextConfig,

    /// Chunk segmentation
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Word highlighting
    #[serde(default)]
    pub highlight: HighlightConfig,

    /// Scheduler timing
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Utterance parameters
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Simulated engine
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a TOML document, then validate
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_chunk_chars == 0 {
            return Err(ConfigError::invalid(
                "chunking.max_chunk_chars",
                "must be greater than zero",
            ));
        }

        if self.playback.keep_alive_enabled && self.playback.keep_alive_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "playback.keep_alive_interval_ms",
                "must be greater than zero while keep-alive is enabled",
            ));
        }

        if self.playback.event_capacity == 0 {
            return Err(ConfigError::invalid(
                "playback.event_capacity",
                "must be greater than zero",
            ));
        }

        if !(0.1..=10.0).contains(&self.voice.rate) {
            return Err(ConfigError::invalid(
                "voice.rate",
                format!("{} is outside 0.1..=10.0", self.voice.rate),
            ));
        }

        if !(0.0..=2.0).contains(&self.voice.pitch) {
            return Err(ConfigError::invalid(
                "voice.pitch",
                format!("{} is outside 0.0..=2.0", self.voice.pitch),
            ));
        }

        if !(0.0..=1.0).contains(&self.voice.volume) {
            return Err(ConfigError::invalid(
                "voice.volume",
                format!("{} is outside 0.0..=1.0", self.voice.volume),
            ));
        }

        if self.simulation.words_per_minute == 0 {
            return Err(ConfigError::invalid(
                "simulation.words_per_minute",
                "must be greater than zero",
            ));
        }

        if self.highlight.tolerance_chars == 0 {
            tracing::warn!("highlight.tolerance_chars is 0, only exact word edges will highlight");
        }

        Ok(())
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`READ_ALOUD__` prefix, `__` separator)
/// 2. `path`, when given (must exist)
/// 3. config/default.{toml,yaml,json} (optional)
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("READ_ALOUD")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
