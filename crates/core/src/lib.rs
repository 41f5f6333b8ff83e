//! Core traits and types for read-aloud playback
//!
//! This crate provides foundational types used across all other crates:
//! - Word boundary index over cleaned text
//! - Playback state and the snapshot published to the UI
//! - The `SpeechEngine` capability and its event types
//! - Error types

pub mod error;
pub mod playback;
pub mod text;
pub mod traits;

pub use error::{EngineError, Error, Result};
pub use playback::{PlaybackSnapshot, PlaybackState};
pub use text::{TextIndex, WordBoundary, WordPosition};
pub use traits::{
    BoundaryEvent, BoundaryKind, EngineErrorKind, EngineEvent, EngineEventKind, SpeechEngine,
    Utterance, UtteranceEvents, UtteranceId, VoiceHandle,
};
