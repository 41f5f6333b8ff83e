//! Configuration for read-aloud playback
//!
//! Settings are layered from `config/default.*`, an optional explicit file and
//! `READ_ALOUD__*` environment variables.

mod playback;
mod settings;

pub use playback::{
    ChunkingConfig, HighlightConfig, PlaybackConfig, SimulationConfig, TextConfig, VoiceConfig,
};
pub use settings::{load_settings, ObservabilityConfig, Settings};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
