//! Playback state

use serde::{Deserialize, Serialize};

use crate::text::WordPosition;

/// Playback state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing queued or playing
    #[default]
    Idle,
    /// Engine is reading a chunk
    Speaking,
    /// Engine reported a pause
    Paused,
}

impl PlaybackState {
    /// Speaking or paused mid-utterance
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

/// Observable state published to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    /// Engine was detected at construction
    pub supported: bool,
    pub current_word: Option<WordPosition>,
    pub current_chunk: usize,
    pub total_chunks: usize,
}

impl PlaybackSnapshot {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Default::default()
        }
    }

    /// True while an utterance is in progress, including while paused
    pub fn speaking(&self) -> bool {
        self.state.is_active()
    }

    pub fn paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }
}
