//! Chunked Text-to-Speech playback
//!
//! Features:
//! - Sentence-aligned chunking for reliable engine utterances
//! - Utterance chaining so chunks read as one continuous text
//! - Word tracking across chunk seams
//! - Keep-alive nudges for engines that stall on long sessions
//! - Simulated engine for tests and the CLI

mod boundary;
mod chunker;
mod offsets;
mod scheduler;
mod simulated;
mod watchdog;

pub use boundary::{BoundaryMapper, BoundaryMatch};
pub use chunker::{ChunkerConfig, SentenceChunker, TextChunk};
pub use offsets::ChunkOffsetTable;
pub use scheduler::{PlaybackScheduler, SharedScheduler};
pub use simulated::SimulatedEngine;
pub use watchdog::KeepAliveWatchdog;
