//! Read-aloud playback pipeline
//!
//! This crate drives a platform speech engine through lesson text and keeps
//! track of the word being spoken:
//! - Sentence-aligned chunking under a length ceiling
//! - Sequential utterance scheduling with chunk chaining
//! - Cross-chunk offset reconciliation and nearest-word matching
//! - Keep-alive nudges against the engine stall bug
//! - Error recovery that never reaches the caller

pub mod reader;
pub mod tts;

// Reader exports
pub use reader::{ReadAloud, ReadAloudEvent};

// TTS exports
pub use tts::{
    BoundaryMapper, BoundaryMatch, ChunkOffsetTable, KeepAliveWatchdog, PlaybackScheduler,
    SentenceChunker, SimulatedEngine, TextChunk,
};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No async runtime available")]
    NoRuntime,
}

impl From<PipelineError> for read_aloud_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config(message) => read_aloud_core::Error::Config(message),
            other => read_aloud_core::Error::Pipeline(other.to_string()),
        }
    }
}
