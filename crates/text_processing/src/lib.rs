//! Text Processing for read-aloud playback
//!
//! This crate turns raw lesson text into something a speech engine can read
//! and a highlighter can follow:
//! - **Cleaning**: strip markup, decode entities, drop control characters
//! - **Indexing**: one `WordBoundary` per non-whitespace token
//! - **Normalization**: case and diacritic folding for fallback word matching
//!
//! # Example
//!
//! ```ignore
//! use read_aloud_text_processing::TextPreparer;
//!
//! let preparer = TextPreparer::default();
//! let index = preparer.prepare("<p>Hello <b>world</b></p>");
//! assert_eq!(index.cleaned_text, "Hello world");
//! ```

pub mod markup;
pub mod normalize;

mod error;
mod preparer;

pub use error::{Result, TextProcessingError};
pub use normalize::normalize_word;
pub use preparer::TextPreparer;
