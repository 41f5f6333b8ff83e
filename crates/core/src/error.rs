//! Error types for read-aloud playback

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type shared by the read-aloud crates
#[derive(Error, Debug)]
pub enum Error {
    // Speech engine call failures
    #[error("Speech engine error: {0}")]
    Engine(#[from] EngineError),

    // Text preparation failures
    #[error("Text processing error: {0}")]
    TextProcessing(String),

    // Chunking/scheduling failures
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Failures returned synchronously by a `SpeechEngine` call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("speech synthesis is not available on this platform")]
    Unavailable,

    #[error("utterance rejected: {0}")]
    Rejected(String),

    #[error("engine backend failure: {0}")]
    Backend(String),
}
