//! Sentence-aligned chunking for TTS
//!
//! Splits cleaned text into utterances short enough for the engine. Chunks
//! are contiguous slices: concatenating them gives back the input exactly.

/// Chunk output from the chunker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The text to speak, including trailing whitespace
    pub text: String,
    /// Length in characters
    pub char_len: usize,
}

impl TextChunk {
    fn new(text: String, char_len: usize) -> Self {
        Self { text, char_len }
    }

    /// Characters `[start, start + len)` of this chunk, clamped to its end
    pub fn slice_chars(&self, start: usize, len: usize) -> Option<String> {
        if start >= self.char_len || len == 0 {
            return None;
        }
        Some(self.text.chars().skip(start).take(len).collect())
    }
}

/// Sentence chunker configuration
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk (a single longer sentence still forms one chunk)
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 150 }
    }
}

/// Sentence chunker for engine utterances
#[derive(Debug, Clone, Default)]
pub struct SentenceChunker {
    config: ChunkerConfig,
}

impl SentenceChunker {
    /// Create a new sentence chunker
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Create a chunker with the given ceiling
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self::new(ChunkerConfig { max_chars })
    }

    /// Greedily pack whole sentences into chunks under the ceiling
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in split_sentences(text) {
            let len = sentence.chars().count();

            if current_len > 0 && current_len + len > self.config.max_chars {
                chunks.push(TextChunk::new(std::mem::take(&mut current), current_len));
                current_len = 0;
            }

            current.push_str(sentence);
            current_len += len;
        }

        if current_len > 0 {
            chunks.push(TextChunk::new(current, current_len));
        }

        tracing::debug!(
            chunks = chunks.len(),
            max_chars = self.config.max_chars,
            "Split text into chunks"
        );

        chunks
    }
}

/// Cut text after each terminator run that is followed by whitespace.
///
/// The whitespace stays with the sentence it follows, so the units tile the
/// input. Closing quotes and brackets directly after a terminator belong to
/// the sentence too.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        while let Some(&(_, next)) = chars.peek() {
            if is_terminator(next) || is_closer(next) {
                chars.next();
            } else {
                break;
            }
        }

        match chars.peek() {
            Some(&(_, next)) if next.is_whitespace() => {}
            _ => continue,
        }

        let mut end = text.len();
        while let Some(&(i, next)) = chars.peek() {
            if next.is_whitespace() {
                chars.next();
            } else {
                end = i;
                break;
            }
        }

        units.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        units.push(&text[start..]);
    }

    units
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | ')' | ']' | '»')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(chunks: &[TextChunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_sentence_units_tile_input() {
        let text = "One. Two!  Three? Four";
        let units = split_sentences(text);
        assert_eq!(units, vec!["One. ", "Two!  ", "Three? ", "Four"]);
        assert_eq!(units.concat(), text);
    }

    #[test]
    fn test_terminator_without_whitespace_does_not_split() {
        let units = split_sentences("Version 2.5 is out.Really");
        assert_eq!(units, vec!["Version 2.5 is out.Really"]);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let units = split_sentences("He said \"stop.\" Then left.");
        assert_eq!(units, vec!["He said \"stop.\" ", "Then left."]);
    }

    #[test]
    fn test_scenario_two_sentences() {
        let text = "Hello world. This is a test of chunking behavior that runs long enough to exceed the limit.";
        let chunks = SentenceChunker::with_max_chars(20).split(text);

        // the second sentence is longer than the ceiling and stays whole
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Hello world. ");
        assert!(chunks[1].text.ends_with("limit."));
        assert!(chunks[1].char_len > 20);
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_scenario_three_sentences() {
        let text = "Hello world. This is a test. Of chunking behavior that runs long enough to exceed the limit.";
        let chunks = SentenceChunker::with_max_chars(20).split(text);

        assert!(chunks.len() >= 3);
        for chunk in &chunks[..chunks.len() - 1] {
            let trimmed = chunk.text.trim_end();
            assert!(trimmed.ends_with(['.', '!', '?']), "chunk {:?}", chunk.text);
        }
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_sentences_pack_under_ceiling() {
        let text = "A b. C d. E f. G h.";
        let chunks = SentenceChunker::with_max_chars(10).split(text);
        assert_eq!(
            chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            vec!["A b. C d. ", "E f. G h."]
        );
        assert!(chunks.iter().all(|c| c.char_len <= 10));
    }

    #[test]
    fn test_empty_and_unterminated() {
        let chunker = SentenceChunker::default();
        assert!(chunker.split("").is_empty());

        let chunks = chunker.split("no terminators here at all");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "no terminators here at all");
    }

    #[test]
    fn test_lossless_for_varied_inputs() {
        let inputs = [
            "",
            " ",
            "...",
            "Wait... what?! Really.",
            "Ünïcödé sentences. Ça va? Oui!",
            "Trailing space. ",
            "Tabs.\tAnd\nnewlines.\n\nEnd",
            "A very long sentence without any terminator that keeps going well past any reasonable ceiling for a single chunk",
        ];

        for max in [1, 5, 20, 150] {
            let chunker = SentenceChunker::with_max_chars(max);
            for input in inputs {
                let chunks = chunker.split(input);
                assert_eq!(joined(&chunks), input, "max={max} input={input:?}");
                for chunk in &chunks {
                    assert_eq!(chunk.char_len, chunk.text.chars().count());
                    assert!(chunk.char_len > 0);
                }
            }
        }
    }

    #[test]
    fn test_slice_chars() {
        let chunk = TextChunk::new("Café au lait".to_string(), 12);
        assert_eq!(chunk.slice_chars(0, 4).as_deref(), Some("Café"));
        assert_eq!(chunk.slice_chars(8, 10).as_deref(), Some("lait"));
        assert_eq!(chunk.slice_chars(12, 1), None);
    }
}
