//! Traits at the seams of the read-aloud engine

mod engine;

pub use engine::{
    BoundaryEvent, BoundaryKind, EngineErrorKind, EngineEvent, EngineEventKind, SpeechEngine,
    Utterance, UtteranceEvents, UtteranceId, VoiceHandle,
};
