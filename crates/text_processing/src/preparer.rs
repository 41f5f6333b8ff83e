//! Text preparation: cleaning plus word boundary indexing

use once_cell::sync::Lazy;
use regex::Regex;

use read_aloud_config::TextConfig;
use read_aloud_core::{TextIndex, WordBoundary};

use crate::markup::{collapse_whitespace, strip_control, strip_markup};
use crate::normalize::normalize_word;
use crate::{Result, TextProcessingError};

// Runs of non-whitespace or whitespace; together they tile the whole text
static TOKENS: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\S+|\s+"));

/// Builds a `TextIndex` from raw, possibly markup-laced text
#[derive(Debug, Clone, Default)]
pub struct TextPreparer {
    config: TextConfig,
}

impl TextPreparer {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    /// Clean `raw` and index its words.
    ///
    /// Never fails: on any internal error the raw text is returned as an
    /// unanalyzed, boundary-free index and playback proceeds without
    /// highlighting.
    pub fn prepare(&self, raw: &str) -> TextIndex {
        match self.try_prepare(raw) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Text analysis failed, highlighting disabled for this text");
                TextIndex::unanalyzed(raw)
            }
        }
    }

    /// Clean `raw` and index its words, reporting internal failures
    pub fn try_prepare(&self, raw: &str) -> Result<TextIndex> {
        let cleaned = self.clean(raw)?;
        let boundaries = index_words(&cleaned)?;
        verify_boundaries(&boundaries)?;

        tracing::debug!(
            raw_len = raw.len(),
            cleaned_len = cleaned.len(),
            words = boundaries.len(),
            "Prepared text"
        );

        Ok(TextIndex::new(cleaned, boundaries))
    }

    /// Produce the cleaned text all offsets refer to
    pub fn clean(&self, raw: &str) -> Result<String> {
        let text = if self.config.strip_markup {
            strip_markup(raw)?
        } else {
            raw.to_string()
        };

        let text = strip_control(&text);

        Ok(if self.config.collapse_whitespace {
            collapse_whitespace(&text)
        } else {
            text
        })
    }
}

/// Record one boundary per non-whitespace run, in character offsets
fn index_words(cleaned: &str) -> Result<Vec<WordBoundary>> {
    let tokens = match Lazy::force(&TOKENS) {
        Ok(regex) => regex,
        Err(e) => return Err(TextProcessingError::Pattern(e.to_string())),
    };

    let mut boundaries = Vec::new();
    let mut char_pos = 0;

    for m in tokens.find_iter(cleaned) {
        let token = m.as_str();
        let len = token.chars().count();

        if !token.chars().all(char::is_whitespace) {
            boundaries.push(WordBoundary {
                word: token.to_string(),
                normalized_word: normalize_word(token),
                start: char_pos,
                end: char_pos + len,
            });
        }

        char_pos += len;
    }

    Ok(boundaries)
}

fn verify_boundaries(boundaries: &[WordBoundary]) -> Result<()> {
    let mut previous_end = 0;

    for (index, boundary) in boundaries.iter().enumerate() {
        if boundary.end <= boundary.start {
            return Err(TextProcessingError::InvalidBoundaries {
                index,
                reason: format!("empty span {}..{}", boundary.start, boundary.end),
            });
        }
        if index > 0 && boundary.start < previous_end {
            return Err(TextProcessingError::InvalidBoundaries {
                index,
                reason: format!(
                    "starts at {} before previous end {}",
                    boundary.start, previous_end
                ),
            });
        }
        previous_end = boundary.end;
    }

    Ok(())
}
