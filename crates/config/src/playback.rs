//! Playback configuration sections

use serde::{Deserialize, Serialize};

/// Text cleaning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Remove HTML/XML tags and decode character entities
    #[serde(default = "default_true")]
    pub strip_markup: bool,

    /// Collapse whitespace runs to one space and trim the ends
    #[serde(default = "default_true")]
    pub collapse_whitespace: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            strip_markup: true,
            collapse_whitespace: true,
        }
    }
}

/// Chunk segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk length ceiling in characters.
    ///
    /// Long single utterances trigger the engine stall bug and accumulate
    /// boundary drift, so this stays small.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    150
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

/// Word highlight configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Maximum distance (characters) between an engine offset and a word edge
    #[serde(default = "default_tolerance_chars")]
    pub tolerance_chars: usize,

    /// Prefer a word whose normalized form matches the spoken token
    #[serde(default = "default_true")]
    pub normalized_fallback: bool,
}

fn default_tolerance_chars() -> usize {
    50
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            tolerance_chars: default_tolerance_chars(),
            normalized_fallback: true,
        }
    }
}

/// Scheduler timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay before the first chunk of a `speak()` is submitted (ms)
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Issue periodic pause/resume nudges while speaking
    #[serde(default = "default_true")]
    pub keep_alive_enabled: bool,

    /// Interval between keep-alive nudges (ms)
    #[serde(default = "default_keep_alive_interval_ms")]
    pub keep_alive_interval_ms: u64,

    /// Capacity of the notification broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_start_delay_ms() -> u64 {
    50
}
fn default_keep_alive_interval_ms() -> u64 {
    10_000
}
fn default_event_capacity() -> usize {
    100
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            keep_alive_enabled: true,
            keep_alive_interval_ms: default_keep_alive_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Utterance voice parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speaking rate (1.0 = normal)
    #[serde(default = "default_one")]
    pub rate: f32,

    /// Pitch (1.0 = normal)
    #[serde(default = "default_one")]
    pub pitch: f32,

    /// Volume (0.0 - 1.0)
    #[serde(default = "default_one")]
    pub volume: f32,

    /// Voice handle name, as listed by the platform
    #[serde(default)]
    pub voice: Option<String>,
}

fn default_one() -> f32 {
    1.0
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

/// Simulated engine behaviour (CLI and tests)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Report the engine as present
    #[serde(default = "default_true")]
    pub available: bool,

    /// Pace at rate 1.0
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,

    /// Raise a synthesis error after this many words
    #[serde(default)]
    pub fail_after_words: Option<usize>,

    /// Go silent (no further events) after this much uninterrupted speech (ms)
    #[serde(default)]
    pub stall_after_ms: Option<u64>,
}

fn default_words_per_minute() -> u32 {
    180
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            available: true,
            words_per_minute: default_words_per_minute(),
            fail_after_words: None,
            stall_after_ms: None,
        }
    }
}

fn default_true() -> bool {
    true
}
