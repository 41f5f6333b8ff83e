//! Speech engine capability
//!
//! The platform TTS engine is a process-wide, asynchronous black box. It is
//! handed to the scheduler as an `Arc<dyn SpeechEngine>` rather than reached
//! through global state. Calls are fire-and-forget; lifecycle is reported back
//! through the per-utterance [`UtteranceEvents`] sink.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::EngineError;

/// Identifier of one submitted utterance, unique per engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// Opaque voice handle chosen by an external voice picker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceHandle(String);

impl VoiceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One unit of text submitted for synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// Speaking rate (1.0 = normal)
    pub rate: f32,
    /// Pitch (1.0 = normal)
    pub pitch: f32,
    /// Volume (0.0 - 1.0)
    pub volume: f32,
    pub voice: Option<VoiceHandle>,
}

/// Kind of a boundary notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryKind {
    Word,
    Sentence,
    Other(String),
}

impl BoundaryKind {
    /// Map an engine-reported boundary name (`"word"`, `"sentence"`, ...)
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "word" => BoundaryKind::Word,
            "sentence" => BoundaryKind::Sentence,
            other => BoundaryKind::Other(other.to_string()),
        }
    }
}

/// Synthesis reached a character offset within the current utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryEvent {
    pub kind: BoundaryKind,
    /// Chunk-local character index
    pub char_index: usize,
    /// Length of the spoken token, when the engine reports it
    pub char_length: Option<usize>,
}

/// Runtime failures reported by the engine while speaking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErrorKind {
    Canceled,
    Interrupted,
    AudioBusy,
    AudioHardware,
    Network,
    SynthesisUnavailable,
    SynthesisFailed,
    LanguageUnavailable,
    VoiceUnavailable,
    TextTooLong,
    InvalidArgument,
    NotAllowed,
    Other(String),
}

impl EngineErrorKind {
    /// Map an engine error code such as `"voice-unavailable"`
    pub fn from_code(code: &str) -> Self {
        match code {
            "canceled" => EngineErrorKind::Canceled,
            "interrupted" => EngineErrorKind::Interrupted,
            "audio-busy" => EngineErrorKind::AudioBusy,
            "audio-hardware" => EngineErrorKind::AudioHardware,
            "network" => EngineErrorKind::Network,
            "synthesis-unavailable" => EngineErrorKind::SynthesisUnavailable,
            "synthesis-failed" => EngineErrorKind::SynthesisFailed,
            "language-unavailable" => EngineErrorKind::LanguageUnavailable,
            "voice-unavailable" => EngineErrorKind::VoiceUnavailable,
            "text-too-long" => EngineErrorKind::TextTooLong,
            "invalid-argument" => EngineErrorKind::InvalidArgument,
            "not-allowed" => EngineErrorKind::NotAllowed,
            other => EngineErrorKind::Other(other.to_string()),
        }
    }

    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            EngineErrorKind::Canceled | EngineErrorKind::Interrupted => {
                "Reading was interrupted.".to_string()
            }
            EngineErrorKind::AudioBusy | EngineErrorKind::AudioHardware => {
                "The audio device is unavailable.".to_string()
            }
            EngineErrorKind::Network => "The speech service could not be reached.".to_string(),
            EngineErrorKind::LanguageUnavailable | EngineErrorKind::VoiceUnavailable => {
                "The selected voice is not available.".to_string()
            }
            EngineErrorKind::TextTooLong => "The text is too long to read aloud.".to_string(),
            EngineErrorKind::NotAllowed => "Reading aloud is not allowed right now.".to_string(),
            EngineErrorKind::SynthesisUnavailable
            | EngineErrorKind::SynthesisFailed
            | EngineErrorKind::InvalidArgument => "Speech synthesis failed.".to_string(),
            EngineErrorKind::Other(code) => format!("Speech synthesis failed ({code})."),
        }
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            EngineErrorKind::Canceled => "canceled",
            EngineErrorKind::Interrupted => "interrupted",
            EngineErrorKind::AudioBusy => "audio-busy",
            EngineErrorKind::AudioHardware => "audio-hardware",
            EngineErrorKind::Network => "network",
            EngineErrorKind::SynthesisUnavailable => "synthesis-unavailable",
            EngineErrorKind::SynthesisFailed => "synthesis-failed",
            EngineErrorKind::LanguageUnavailable => "language-unavailable",
            EngineErrorKind::VoiceUnavailable => "voice-unavailable",
            EngineErrorKind::TextTooLong => "text-too-long",
            EngineErrorKind::InvalidArgument => "invalid-argument",
            EngineErrorKind::NotAllowed => "not-allowed",
            EngineErrorKind::Other(code) => code,
        };
        f.write_str(code)
    }
}

/// Lifecycle notification for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    Start,
    End,
    Pause,
    Resume,
    Boundary(BoundaryEvent),
    Error(EngineErrorKind),
}

/// Engine event tagged with the utterance it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub utterance: UtteranceId,
    pub kind: EngineEventKind,
}

/// Per-utterance event sink handed to the engine with each `speak`
///
/// Sending never fails from the engine's point of view: once the reader is
/// torn down events are dropped.
#[derive(Debug, Clone)]
pub struct UtteranceEvents {
    utterance: UtteranceId,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl UtteranceEvents {
    pub fn new(utterance: UtteranceId, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { utterance, tx }
    }

    pub fn utterance(&self) -> UtteranceId {
        self.utterance
    }

    pub fn started(&self) {
        self.emit(EngineEventKind::Start);
    }

    pub fn ended(&self) {
        self.emit(EngineEventKind::End);
    }

    pub fn paused(&self) {
        self.emit(EngineEventKind::Pause);
    }

    pub fn resumed(&self) {
        self.emit(EngineEventKind::Resume);
    }

    pub fn boundary(&self, kind: BoundaryKind, char_index: usize, char_length: Option<usize>) {
        self.emit(EngineEventKind::Boundary(BoundaryEvent {
            kind,
            char_index,
            char_length,
        }));
    }

    pub fn failed(&self, error: EngineErrorKind) {
        self.emit(EngineEventKind::Error(error));
    }

    /// Receiver side is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn emit(&self, kind: EngineEventKind) {
        let _ = self.tx.send(EngineEvent {
            utterance: self.utterance,
            kind,
        });
    }
}

/// Platform text-to-speech capability
///
/// Only one engine is assumed active application-wide. Implementations must
/// not block: `speak` queues the utterance and returns, progress is reported
/// through `events`.
pub trait SpeechEngine: Send + Sync {
    /// Feature detection, queried once when a reader is constructed
    fn is_available(&self) -> bool;

    /// Submit an utterance for synthesis
    fn speak(&self, utterance: Utterance, events: UtteranceEvents) -> Result<(), EngineError>;

    /// Drop the current and all queued utterances
    fn cancel(&self) -> Result<(), EngineError>;

    fn pause(&self) -> Result<(), EngineError>;

    fn resume(&self) -> Result<(), EngineError>;
}
