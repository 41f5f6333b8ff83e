//! Word boundary index types
//!
//! All offsets are character offsets (Unicode scalar values) into the cleaned
//! text, never byte offsets.

use serde::{Deserialize, Serialize};

/// One non-whitespace token of the cleaned text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBoundary {
    /// Token as it appears in the cleaned text
    pub word: String,
    /// Case and diacritic insensitive form, used for fallback matching
    pub normalized_word: String,
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive), always greater than `start`
    pub end: usize,
}

impl WordBoundary {
    /// Length in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Distance from a global character index to the nearer edge of this word
    pub fn distance_to(&self, index: usize) -> usize {
        index.abs_diff(self.start).min(index.abs_diff(self.end))
    }
}

/// Cleaned text plus its word boundaries, rebuilt on every `speak()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextIndex {
    /// Text after markup and control-character removal
    pub cleaned_text: String,
    /// Boundaries in strictly ascending, non-overlapping order
    pub boundaries: Vec<WordBoundary>,
}

impl TextIndex {
    pub fn new(cleaned_text: String, boundaries: Vec<WordBoundary>) -> Self {
        Self {
            cleaned_text,
            boundaries,
        }
    }

    /// Degraded index: the raw text with no word analysis.
    ///
    /// Playback still proceeds over it; highlighting is simply unavailable.
    pub fn unanalyzed(raw: impl Into<String>) -> Self {
        Self {
            cleaned_text: raw.into(),
            boundaries: Vec::new(),
        }
    }

    /// Has word analysis?
    pub fn is_analyzed(&self) -> bool {
        !self.boundaries.is_empty()
    }

    /// Cleaned text length in characters
    pub fn char_len(&self) -> usize {
        self.cleaned_text.chars().count()
    }

    /// Nothing worth speaking
    pub fn is_blank(&self) -> bool {
        self.cleaned_text.trim().is_empty()
    }
}

/// The word currently being spoken, as exposed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPosition {
    pub word: String,
    pub start: usize,
    pub end: usize,
    /// Global character index computed from the engine event
    pub char_index: usize,
}

impl WordPosition {
    pub fn from_boundary(boundary: &WordBoundary, char_index: usize) -> Self {
        Self {
            word: boundary.word.clone(),
            start: boundary.start,
            end: boundary.end,
            char_index,
        }
    }
}
