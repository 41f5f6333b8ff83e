//! Error types for text processing

use thiserror::Error;

/// Text processing errors
#[derive(Debug, Error)]
pub enum TextProcessingError {
    /// A built-in pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Produced boundaries break the ordering invariant
    #[error("Invalid boundary at index {index}: {reason}")]
    InvalidBoundaries { index: usize, reason: String },
}

impl From<TextProcessingError> for read_aloud_core::Error {
    fn from(err: TextProcessingError) -> Self {
        read_aloud_core::Error::TextProcessing(err.to_string())
    }
}

/// Result type for text processing
pub type Result<T> = std::result::Result<T, TextProcessingError>;
