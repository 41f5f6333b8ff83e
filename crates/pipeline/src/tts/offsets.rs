//! Cumulative chunk offsets
//!
//! Engines report boundary positions relative to the utterance being spoken.
//! This table turns a `(chunk, local index)` pair into an offset in the full
//! cleaned text.

use super::chunker::TextChunk;

/// Maps chunk index to the character offset where the chunk starts
///
/// Holds one more entry than there are chunks: the last entry is the total
/// length, so `offset(i) + len(i) == offset(i + 1)` for every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOffsetTable {
    offsets: Vec<usize>,
}

impl ChunkOffsetTable {
    /// Build from chunk lengths in characters
    pub fn from_lengths(lengths: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut total = 0;
        offsets.push(total);
        for len in lengths {
            total += len;
            offsets.push(total);
        }
        Self { offsets }
    }

    pub fn from_chunks(chunks: &[TextChunk]) -> Self {
        let lengths: Vec<usize> = chunks.iter().map(|c| c.char_len).collect();
        Self::from_lengths(&lengths)
    }

    pub fn chunk_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn total_len(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Start offset of chunk `index`
    pub fn offset(&self, index: usize) -> Option<usize> {
        if index < self.chunk_count() {
            Some(self.offsets[index])
        } else {
            None
        }
    }

    /// Length of chunk `index`
    pub fn chunk_len(&self, index: usize) -> Option<usize> {
        self.offset(index)
            .map(|start| self.offsets[index + 1] - start)
    }

    /// Global offset of a chunk-local index.
    ///
    /// The local index is not clamped to the chunk: engines occasionally
    /// report positions past the end of the utterance and the nearest-word
    /// match decides what to do with those. An index so large the sum
    /// overflows has no global position and yields `None`.
    pub fn to_global(&self, index: usize, local: usize) -> Option<usize> {
        self.offset(index)?.checked_add(local)
    }
}
