//! Playback scheduler
//!
//! Explicit state machine over engine lifecycle events:
//!
//! ```text
//! Idle --start--> Speaking <--pause/resume--> Paused
//!   ^                 |                          |
//!   +---- end of last chunk / stop / error ------+
//! ```
//!
//! All state lives behind one `parking_lot::Mutex`. Engine callbacks arrive
//! as [`EngineEvent`]s and are fed in one at a time through
//! [`PlaybackScheduler::handle_event`]. Timers (start delay, keep-alive) hold
//! only a weak reference back to the scheduler and re-check the playback
//! generation under the lock, so nothing they do can outlive a `stop()`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use read_aloud_config::Settings;
use read_aloud_core::{
    BoundaryEvent, BoundaryKind, EngineError, EngineErrorKind, EngineEvent, EngineEventKind,
    PlaybackSnapshot, PlaybackState, SpeechEngine, TextIndex, Utterance, UtteranceEvents,
    UtteranceId, VoiceHandle, WordPosition,
};
use read_aloud_text_processing::TextPreparer;

use super::boundary::{BoundaryMapper, BoundaryMatch};
use super::chunker::{SentenceChunker, TextChunk};
use super::offsets::ChunkOffsetTable;
use super::watchdog::KeepAliveWatchdog;
use crate::reader::ReadAloudEvent;

/// Scheduler shared between the façade, the event driver and timers
pub type SharedScheduler = Arc<Mutex<PlaybackScheduler>>;

/// User request waiting for the engine to confirm it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Pause,
    Resume,
}

/// Text being read: rebuilt on every `speak()`
#[derive(Debug)]
struct Session {
    index: TextIndex,
    chunks: Vec<TextChunk>,
    table: ChunkOffsetTable,
    current: usize,
}

/// Parameters applied to each new utterance
#[derive(Debug, Clone)]
struct VoiceParams {
    rate: f32,
    pitch: f32,
    volume: f32,
    voice: Option<VoiceHandle>,
}

/// Drives a speech engine through chunked text
pub struct PlaybackScheduler {
    engine: Arc<dyn SpeechEngine>,
    runtime: Handle,
    this: Weak<Mutex<PlaybackScheduler>>,
    supported: bool,
    closed: bool,

    preparer: TextPreparer,
    chunker: SentenceChunker,
    mapper: BoundaryMapper,
    watchdog: KeepAliveWatchdog,
    start_delay: Duration,
    voice: VoiceParams,

    events_tx: mpsc::UnboundedSender<EngineEvent>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    notify_tx: broadcast::Sender<ReadAloudEvent>,

    state: PlaybackState,
    session: Option<Session>,
    current_word: Option<WordPosition>,
    last_text: Option<String>,
    active: Option<UtteranceId>,
    requested: Option<Request>,
    /// A keep-alive tick has already seen `requested` unconfirmed
    request_aged: bool,
    pending_start: Option<JoinHandle<()>>,
    next_utterance: u64,
    generation: u64,
}

impl PlaybackScheduler {
    /// Create a scheduler reporting engine events through `events_tx`.
    ///
    /// Engine availability is queried exactly once, here.
    pub fn new_shared(
        engine: Arc<dyn SpeechEngine>,
        settings: &Settings,
        runtime: Handle,
        events_tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> SharedScheduler {
        let supported = engine.is_available();
        if !supported {
            tracing::info!("Speech engine unavailable, read-aloud disabled");
        }

        let snapshot = if supported {
            PlaybackSnapshot {
                supported: true,
                ..Default::default()
            }
        } else {
            PlaybackSnapshot::unsupported()
        };
        let (snapshot_tx, _) = watch::channel(snapshot);
        let (notify_tx, _) = broadcast::channel(settings.playback.event_capacity);

        Arc::new_cyclic(|this| {
            Mutex::new(Self {
                engine,
                runtime,
                this: this.clone(),
                supported,
                closed: false,
                preparer: TextPreparer::new(settings.text.clone()),
                chunker: SentenceChunker::with_max_chars(settings.chunking.max_chunk_chars),
                mapper: BoundaryMapper::new(
                    settings.highlight.tolerance_chars,
                    settings.highlight.normalized_fallback,
                ),
                watchdog: KeepAliveWatchdog::new(
                    Duration::from_millis(settings.playback.keep_alive_interval_ms),
                    settings.playback.keep_alive_enabled,
                ),
                start_delay: Duration::from_millis(settings.playback.start_delay_ms),
                voice: VoiceParams {
                    rate: settings.voice.rate,
                    pitch: settings.voice.pitch,
                    volume: settings.voice.volume,
                    voice: settings.voice.voice.clone().map(VoiceHandle::new),
                },
                events_tx,
                snapshot_tx,
                notify_tx,
                state: PlaybackState::Idle,
                session: None,
                current_word: None,
                last_text: None,
                active: None,
                requested: None,
                request_aged: false,
                pending_start: None,
                next_utterance: 0,
                generation: 0,
            })
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Start reading `text`, or the last text read when `None`.
    ///
    /// Whatever is playing is cancelled first.
    pub fn speak(&mut self, text: Option<&str>) {
        if !self.accepts_calls() {
            return;
        }

        let text = match text {
            Some(text) => text.to_string(),
            None => match &self.last_text {
                Some(previous) => previous.clone(),
                None => {
                    tracing::debug!("Nothing to replay");
                    return;
                }
            },
        };

        self.halt();
        self.reset();
        self.last_text = Some(text.clone());

        let index = self.preparer.prepare(&text);
        if index.is_blank() {
            tracing::debug!("Text is blank after cleaning, nothing to speak");
            self.publish();
            return;
        }

        let chunks = self.chunker.split(&index.cleaned_text);
        let table = ChunkOffsetTable::from_chunks(&chunks);
        tracing::info!(
            chunks = chunks.len(),
            chars = table.total_len(),
            words = index.boundaries.len(),
            "Reading aloud"
        );

        self.session = Some(Session {
            index,
            chunks,
            table,
            current: 0,
        });
        self.publish();
        metrics::counter!("read_aloud_utterances_total").increment(1);

        if self.start_delay.is_zero() {
            self.speak_chunk(0);
            return;
        }

        let this = self.this.clone();
        let generation = self.generation;
        let delay = self.start_delay;
        self.pending_start = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(scheduler) = this.upgrade() {
                scheduler.lock().start_pending(generation);
            }
        }));
    }

    /// Cancel playback and reset to `Idle`. Idempotent.
    pub fn stop(&mut self) {
        if !self.accepts_calls() {
            return;
        }

        self.halt();
        self.reset();
        tracing::debug!("Stopped");
    }

    pub fn pause(&mut self) {
        if !self.accepts_calls() {
            return;
        }
        if self.state != PlaybackState::Speaking {
            tracing::debug!(state = ?self.state, "Pause ignored");
            return;
        }

        self.request(Request::Pause);
        if let Err(e) = self.engine.pause() {
            tracing::warn!(error = %e, "Engine pause failed");
            self.requested = None;
        }
    }

    pub fn resume(&mut self) {
        if !self.accepts_calls() {
            return;
        }
        if self.state != PlaybackState::Paused {
            tracing::debug!(state = ?self.state, "Resume ignored");
            return;
        }

        self.request(Request::Resume);
        if let Err(e) = self.engine.resume() {
            tracing::warn!(error = %e, "Engine resume failed");
            self.requested = None;
        }
    }

    /// Cancel everything and refuse further calls
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        if self.supported {
            self.halt();
            self.reset();
        }
        self.closed = true;
        tracing::debug!("Scheduler shut down");
    }

    /// Voice for utterances submitted from now on
    pub fn set_voice(&mut self, voice: Option<VoiceHandle>) {
        self.voice.voice = voice;
    }

    /// Rate for utterances submitted from now on, clamped to `0.1..=10`
    pub fn set_rate(&mut self, rate: f32) {
        let clamped = if rate.is_finite() {
            rate.clamp(0.1, 10.0)
        } else {
            1.0
        };
        if clamped != rate {
            tracing::warn!(requested = rate, applied = clamped, "Speaking rate out of range");
        }
        self.voice.rate = clamped;
    }

    // =========================================================================
    // Engine events
    // =========================================================================

    /// Apply one engine event. Events for any utterance but the active one
    /// are dropped.
    pub fn handle_event(&mut self, event: EngineEvent) {
        if self.closed || self.active != Some(event.utterance) {
            tracing::trace!(utterance = %event.utterance, kind = ?event.kind, "Ignoring stale engine event");
            return;
        }

        match event.kind {
            EngineEventKind::Start => {
                if self.state == PlaybackState::Idle {
                    self.set_state(PlaybackState::Speaking);
                }
            }
            EngineEventKind::End => self.on_end(),
            EngineEventKind::Pause => {
                if self.requested == Some(Request::Pause) {
                    self.requested = None;
                    if self.state == PlaybackState::Speaking {
                        self.set_state(PlaybackState::Paused);
                    }
                } else {
                    tracing::trace!("Unrequested pause event ignored");
                }
            }
            EngineEventKind::Resume => {
                if self.requested == Some(Request::Resume) {
                    self.requested = None;
                    if self.state == PlaybackState::Paused {
                        self.set_state(PlaybackState::Speaking);
                    }
                } else {
                    tracing::trace!("Unrequested resume event ignored");
                }
            }
            EngineEventKind::Boundary(boundary) => self.on_boundary(boundary),
            EngineEventKind::Error(kind) => {
                metrics::counter!("read_aloud_engine_errors_total").increment(1);
                tracing::warn!(utterance = %event.utterance, error = %kind, "Engine reported an error");
                self.recover(kind.user_message());
            }
        }
    }

    fn on_end(&mut self) {
        let next = match &self.session {
            Some(session) if session.current + 1 < session.chunks.len() => session.current + 1,
            _ => {
                self.finish();
                return;
            }
        };
        self.speak_chunk(next);
    }

    fn on_boundary(&mut self, boundary: BoundaryEvent) {
        if boundary.kind != BoundaryKind::Word {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };

        let chunk = session.current;
        let spoken = boundary.char_length.and_then(|len| {
            session
                .chunks
                .get(chunk)
                .and_then(|c| c.slice_chars(boundary.char_index, len))
        });

        let matched = self.mapper.map_spoken(
            &session.index,
            &session.table,
            chunk,
            boundary.char_index,
            spoken.as_deref(),
        );

        match matched {
            BoundaryMatch::Matched(position) => {
                if self.current_word.as_ref() == Some(&position) {
                    return;
                }
                tracing::trace!(word = %position.word, char_index = position.char_index, "Word boundary");
                self.current_word = Some(position.clone());
                self.publish();
                self.notify(ReadAloudEvent::WordChanged(position));
            }
            BoundaryMatch::OutOfTolerance {
                char_index,
                distance,
            } => {
                tracing::debug!(chunk, char_index, distance, "Boundary event outside tolerance");
                metrics::counter!("read_aloud_boundary_discarded_total", "reason" => "tolerance")
                    .increment(1);
            }
            BoundaryMatch::NoWords => {
                metrics::counter!("read_aloud_boundary_discarded_total", "reason" => "no_words")
                    .increment(1);
            }
            BoundaryMatch::UnknownChunk(index) => {
                tracing::debug!(chunk = index, "Boundary event for unknown chunk");
                metrics::counter!("read_aloud_boundary_discarded_total", "reason" => "unknown_chunk")
                    .increment(1);
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn accepts_calls(&self) -> bool {
        if self.closed {
            tracing::debug!("Scheduler closed, call ignored");
            return false;
        }
        self.supported
    }

    fn request(&mut self, request: Request) {
        self.requested = Some(request);
        self.request_aged = false;
    }

    fn start_pending(&mut self, generation: u64) {
        if self.closed || generation != self.generation {
            return;
        }
        self.pending_start = None;
        self.speak_chunk(0);
    }

    fn speak_chunk(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(chunk) = session.chunks.get(index) else {
            return;
        };
        session.current = index;
        let total = session.chunks.len();

        self.next_utterance += 1;
        let id = UtteranceId(self.next_utterance);
        let utterance = Utterance {
            id,
            text: chunk.text.clone(),
            rate: self.voice.rate,
            pitch: self.voice.pitch,
            volume: self.voice.volume,
            voice: self.voice.voice.clone(),
        };
        self.active = Some(id);
        // confirmations for the previous utterance can no longer arrive
        self.requested = None;

        tracing::debug!(chunk = index, total, utterance = %id, "Speaking chunk");
        self.publish();
        self.notify(ReadAloudEvent::ChunkStarted { index, total });

        let events = UtteranceEvents::new(id, self.events_tx.clone());
        if let Err(e) = self.engine.speak(utterance, events) {
            metrics::counter!("read_aloud_engine_errors_total").increment(1);
            tracing::warn!(chunk = index, error = %e, "Engine rejected utterance");
            self.recover(speak_failure_message(&e));
        }
    }

    fn finish(&mut self) {
        self.watchdog.disarm();
        self.active = None;
        self.requested = None;
        self.session = None;
        self.current_word = None;
        self.set_state(PlaybackState::Idle);
        self.publish();
        tracing::info!("Finished reading");
        self.notify(ReadAloudEvent::Finished);
    }

    /// Error recovery: full cancel, reset and a single notification
    fn recover(&mut self, message: String) {
        self.halt();
        self.reset();
        tracing::warn!(%message, "Read-aloud stopped after an engine error");
        self.notify(ReadAloudEvent::Error { message });
    }

    /// Stop every timer and the engine without touching observable state
    fn halt(&mut self) {
        if let Some(task) = self.pending_start.take() {
            task.abort();
        }
        self.watchdog.disarm();
        self.active = None;
        self.requested = None;

        if let Err(e) = self.engine.cancel() {
            tracing::warn!(error = %e, "Engine cancel failed");
        }
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.session = None;
        self.current_word = None;
        self.set_state(PlaybackState::Idle);
        self.publish();
    }

    fn set_state(&mut self, new: PlaybackState) {
        let old = self.state;
        if old == new {
            return;
        }
        self.state = new;
        tracing::debug!(?old, ?new, "Playback state changed");

        match (old, new) {
            (_, PlaybackState::Idle) => self.watchdog.disarm(),
            (PlaybackState::Idle, PlaybackState::Speaking) => self.arm_watchdog(),
            _ => {}
        }

        self.publish();
        self.notify(ReadAloudEvent::StateChanged { old, new });
    }

    fn arm_watchdog(&mut self) {
        let this = self.this.clone();
        let generation = self.generation;
        let _guard = self.runtime.enter();
        self.watchdog.arm(move || match this.upgrade() {
            Some(scheduler) => scheduler.lock().keep_alive_tick(generation),
            None => false,
        });
    }

    /// One keep-alive nudge; `false` stops the timer
    fn keep_alive_tick(&mut self, generation: u64) -> bool {
        if self.closed || generation != self.generation || self.state == PlaybackState::Idle {
            return false;
        }
        if let Some(request) = self.requested {
            if !self.request_aged {
                self.request_aged = true;
                return true;
            }
            tracing::debug!(?request, "Engine never confirmed request, dropping it");
            self.requested = None;
        }
        if self.state == PlaybackState::Paused {
            return true;
        }

        tracing::debug!("Keep-alive nudge");
        if let Err(e) = self.engine.pause() {
            tracing::warn!(error = %e, "Keep-alive pause failed");
        }
        if let Err(e) = self.engine.resume() {
            tracing::warn!(error = %e, "Keep-alive resume failed");
        }
        metrics::counter!("read_aloud_keepalive_nudges_total").increment(1);
        true
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn notify(&self, event: ReadAloudEvent) {
        let _ = self.notify_tx.send(event);
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let (current_chunk, total_chunks) = self
            .session
            .as_ref()
            .map(|s| (s.current, s.chunks.len()))
            .unwrap_or((0, 0));

        PlaybackSnapshot {
            state: self.state,
            supported: self.supported,
            current_word: self.current_word.clone(),
            current_chunk,
            total_chunks,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn current_word(&self) -> Option<&WordPosition> {
        self.current_word.as_ref()
    }

    /// Utterance whose events are currently accepted
    pub fn active_utterance(&self) -> Option<UtteranceId> {
        self.active
    }

    pub fn keep_alive_armed(&self) -> bool {
        self.watchdog.is_armed()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadAloudEvent> {
        self.notify_tx.subscribe()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.pending_start.take() {
            task.abort();
        }
    }
}

fn speak_failure_message(error: &EngineError) -> String {
    match error {
        EngineError::Unavailable => EngineErrorKind::SynthesisUnavailable.user_message(),
        EngineError::Rejected(_) | EngineError::Backend(_) => {
            EngineErrorKind::SynthesisFailed.user_message()
        }
    }
}
