//! Simulated speech engine
//!
//! Paces word boundary events through the utterance text at a configurable
//! words-per-minute instead of producing audio. Used by the CLI and tests,
//! and able to reproduce the failure modes real engines show: synthesis
//! errors and the long-session stall.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use unicode_segmentation::UnicodeSegmentation;

use read_aloud_config::SimulationConfig;
use read_aloud_core::{
    BoundaryKind, EngineError, EngineErrorKind, SpeechEngine, Utterance, UtteranceEvents,
};

#[derive(Debug, Clone, Copy, Default)]
struct PauseState {
    paused: bool,
    /// Incremented on every resume, so a stalled utterance can wait for one
    resumes: u64,
}

struct Current {
    events: UtteranceEvents,
    task: JoinHandle<()>,
}

impl Current {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Counts utterances being synthesised at the same time
#[derive(Debug, Default)]
struct Occupancy {
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct OccupancyGuard(Arc<Occupancy>);

impl OccupancyGuard {
    fn enter(occupancy: Arc<Occupancy>) -> Self {
        let now = occupancy.active.fetch_add(1, Ordering::SeqCst) + 1;
        occupancy.peak.fetch_max(now, Ordering::SeqCst);
        Self(occupancy)
    }
}

impl Drop for OccupancyGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Engine that "speaks" by emitting timed events
pub struct SimulatedEngine {
    config: SimulationConfig,
    runtime: Option<Handle>,
    current: Mutex<Option<Current>>,
    pause_tx: watch::Sender<PauseState>,
    words_spoken: Arc<AtomicUsize>,
    occupancy: Arc<Occupancy>,
}

impl SimulatedEngine {
    /// Create a simulated engine on the current tokio runtime, if any.
    ///
    /// Without a runtime every `speak` is rejected.
    pub fn new(config: SimulationConfig) -> Self {
        let (pause_tx, _) = watch::channel(PauseState::default());
        Self {
            config,
            runtime: Handle::try_current().ok(),
            current: Mutex::new(None),
            pause_tx,
            words_spoken: Arc::new(AtomicUsize::new(0)),
            occupancy: Arc::new(Occupancy::default()),
        }
    }

    /// Words reported so far across all utterances
    pub fn words_spoken(&self) -> usize {
        self.words_spoken.load(Ordering::SeqCst)
    }

    /// Highest number of utterances that were ever synthesising at once
    pub fn max_concurrent(&self) -> usize {
        self.occupancy.peak.load(Ordering::SeqCst)
    }

    fn word_duration(&self, rate: f32) -> Duration {
        let wpm = f64::from(self.config.words_per_minute.max(1));
        let rate = f64::from(rate).max(0.1);
        Duration::from_secs_f64(60.0 / (wpm * rate))
    }

    fn set_paused(&self, paused: bool) {
        self.pause_tx.send_modify(|state| {
            if state.paused && !paused {
                state.resumes += 1;
            }
            state.paused = paused;
        });
    }
}

impl SpeechEngine for SimulatedEngine {
    fn is_available(&self) -> bool {
        self.config.available
    }

    fn speak(&self, utterance: Utterance, events: UtteranceEvents) -> Result<(), EngineError> {
        if !self.config.available {
            return Err(EngineError::Unavailable);
        }
        let Some(runtime) = &self.runtime else {
            return Err(EngineError::Backend("no async runtime".to_string()));
        };

        let run = Synthesis {
            text: utterance.text,
            word_duration: self.word_duration(utterance.rate),
            fail_after_words: self.config.fail_after_words,
            stall_after: self.config.stall_after_ms.map(Duration::from_millis),
            pause_rx: self.pause_tx.subscribe(),
            words_spoken: self.words_spoken.clone(),
            events: events.clone(),
            guard: OccupancyGuard::enter(self.occupancy.clone()),
        };

        tracing::trace!(utterance = %utterance.id, "Simulated speak");
        let task = runtime.spawn(run.run());
        *self.current.lock() = Some(Current { events, task });
        Ok(())
    }

    fn cancel(&self) -> Result<(), EngineError> {
        if let Some(current) = self.current.lock().take() {
            if current.is_running() {
                current.task.abort();
                current.events.failed(EngineErrorKind::Canceled);
            }
        }
        self.set_paused(false);
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.set_paused(true);
        if let Some(current) = self.current.lock().as_ref().filter(|c| c.is_running()) {
            current.events.paused();
        }
        Ok(())
    }

    fn resume(&self) -> Result<(), EngineError> {
        self.set_paused(false);
        if let Some(current) = self.current.lock().as_ref().filter(|c| c.is_running()) {
            current.events.resumed();
        }
        Ok(())
    }
}

/// One utterance being paced out
struct Synthesis {
    text: String,
    word_duration: Duration,
    fail_after_words: Option<usize>,
    stall_after: Option<Duration>,
    pause_rx: watch::Receiver<PauseState>,
    words_spoken: Arc<AtomicUsize>,
    events: UtteranceEvents,
    guard: OccupancyGuard,
}

impl Synthesis {
    async fn run(mut self) {
        self.events.started();

        let mut uninterrupted = Duration::ZERO;
        let mut seen_resumes = self.pause_rx.borrow().resumes;

        for (char_index, char_len) in word_spans(&self.text) {
            self.wait_while_paused().await;

            let resumes = self.pause_rx.borrow().resumes;
            if resumes != seen_resumes {
                seen_resumes = resumes;
                uninterrupted = Duration::ZERO;
            }

            if self.stall_after.is_some_and(|limit| uninterrupted >= limit) {
                tracing::debug!("Simulated engine stalled");
                let _ = self.pause_rx.wait_for(|s| s.resumes != seen_resumes).await;
                seen_resumes = self.pause_rx.borrow().resumes;
                uninterrupted = Duration::ZERO;
                self.wait_while_paused().await;
            }

            let spoken = self.words_spoken.fetch_add(1, Ordering::SeqCst);
            if self.fail_after_words.is_some_and(|limit| spoken >= limit) {
                drop(self.guard);
                self.events.failed(EngineErrorKind::SynthesisFailed);
                return;
            }

            self.events
                .boundary(BoundaryKind::Word, char_index, Some(char_len));
            tokio::time::sleep(self.word_duration).await;
            uninterrupted += self.word_duration;
        }

        self.wait_while_paused().await;
        drop(self.guard);
        self.events.ended();
    }

    async fn wait_while_paused(&mut self) {
        let _ = self.pause_rx.wait_for(|s| !s.paused).await;
    }
}

/// `(char_index, char_len)` of each word, in characters
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut chars_before = 0;
    let mut byte_cursor = 0;

    for (byte_index, word) in text.unicode_word_indices() {
        chars_before += text[byte_cursor..byte_index].chars().count();
        let len = word.chars().count();
        spans.push((chars_before, len));
        chars_before += len;
        byte_cursor = byte_index + word.len();
    }

    spans
}
