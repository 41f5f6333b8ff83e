//! Boundary event to word mapping
//!
//! Engine offsets drift, especially near chunk seams. The mapper picks the
//! word whose nearer edge is closest to the reported position and rejects
//! matches further away than the configured tolerance.

use read_aloud_core::{TextIndex, WordBoundary, WordPosition};
use read_aloud_text_processing::normalize_word;

use super::offsets::ChunkOffsetTable;

/// Outcome of mapping one boundary event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryMatch {
    /// A word within tolerance
    Matched(WordPosition),
    /// Nearest word is further than the tolerance; keep the previous highlight
    OutOfTolerance { char_index: usize, distance: usize },
    /// Index has no word analysis
    NoWords,
    /// Chunk index is not in the offset table
    UnknownChunk(usize),
}

/// Resolves engine-reported offsets to words of the `TextIndex`
#[derive(Debug, Clone)]
pub struct BoundaryMapper {
    tolerance: usize,
    normalized_fallback: bool,
}

impl Default for BoundaryMapper {
    fn default() -> Self {
        Self::new(50, true)
    }
}

impl BoundaryMapper {
    pub fn new(tolerance: usize, normalized_fallback: bool) -> Self {
        Self {
            tolerance,
            normalized_fallback,
        }
    }

    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    /// Map a chunk-local character index to the nearest word
    pub fn map(
        &self,
        index: &TextIndex,
        table: &ChunkOffsetTable,
        chunk: usize,
        char_index: usize,
    ) -> BoundaryMatch {
        self.map_spoken(index, table, chunk, char_index, None)
    }

    /// Like [`map`](Self::map), using the spoken token to break near-misses.
    ///
    /// When the nearest word's normalized form differs from the spoken token,
    /// the closest word within tolerance that does match wins instead.
    pub fn map_spoken(
        &self,
        index: &TextIndex,
        table: &ChunkOffsetTable,
        chunk: usize,
        char_index: usize,
        spoken: Option<&str>,
    ) -> BoundaryMatch {
        let Some(global) = table.to_global(chunk, char_index) else {
            return BoundaryMatch::UnknownChunk(chunk);
        };

        let boundaries = &index.boundaries;
        let Some((nearest, distance)) = nearest_boundary(boundaries, global) else {
            return BoundaryMatch::NoWords;
        };

        if distance > self.tolerance {
            return BoundaryMatch::OutOfTolerance {
                char_index: global,
                distance,
            };
        }

        let chosen = match spoken {
            Some(token) if self.normalized_fallback => {
                let wanted = normalize_word(token);
                if boundaries[nearest].normalized_word == wanted {
                    nearest
                } else {
                    self.matching_within_tolerance(boundaries, global, &wanted)
                        .unwrap_or(nearest)
                }
            }
            _ => nearest,
        };

        BoundaryMatch::Matched(WordPosition::from_boundary(&boundaries[chosen], global))
    }

    fn matching_within_tolerance(
        &self,
        boundaries: &[WordBoundary],
        global: usize,
        wanted: &str,
    ) -> Option<usize> {
        let low = global.saturating_sub(self.tolerance);
        let high = global.saturating_add(self.tolerance);
        let first = boundaries.partition_point(|b| b.end < low);
        let last = boundaries.partition_point(|b| b.start <= high);

        let mut best: Option<(usize, usize)> = None;
        for (i, boundary) in boundaries.iter().enumerate().take(last).skip(first) {
            if boundary.normalized_word != wanted {
                continue;
            }
            let distance = boundary.distance_to(global);
            if distance > self.tolerance {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Boundary minimising `min(|global - start|, |global - end|)`, earliest on ties.
///
/// Boundaries are sorted and disjoint, so the minimum is always either the
/// last word starting at or before `global` or the first one after it.
fn nearest_boundary(boundaries: &[WordBoundary], global: usize) -> Option<(usize, usize)> {
    if boundaries.is_empty() {
        return None;
    }

    let after = boundaries.partition_point(|b| b.start <= global);
    let mut best: Option<(usize, usize)> = None;

    for i in [after.checked_sub(1), Some(after)].into_iter().flatten() {
        if let Some(boundary) = boundaries.get(i) {
            let distance = boundary.distance_to(global);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
    }

    best
}
