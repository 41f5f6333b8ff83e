//! Read-aloud façade
//!
//! `ReadAloud` is the handle UI code holds. It owns the scheduler and the
//! driver task that feeds engine events into it, and never surfaces engine
//! failures to the caller: those arrive as [`ReadAloudEvent::Error`]
//! notifications instead.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use read_aloud_config::Settings;
use read_aloud_core::{
    EngineEvent, PlaybackSnapshot, PlaybackState, SpeechEngine, VoiceHandle, WordPosition,
};

use crate::tts::{PlaybackScheduler, SharedScheduler};
use crate::PipelineError;

/// Notifications published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReadAloudEvent {
    /// Playback state changed
    StateChanged {
        old: PlaybackState,
        new: PlaybackState,
    },
    /// A chunk was submitted to the engine
    ChunkStarted { index: usize, total: usize },
    /// The highlighted word moved
    WordChanged(WordPosition),
    /// The last chunk finished
    Finished,
    /// Playback stopped after an engine error
    Error { message: String },
}

struct ReaderInner {
    scheduler: SharedScheduler,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ReaderInner {
    fn drop(&mut self) {
        self.scheduler.lock().shutdown();
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
        }
    }
}

/// Read-aloud handle, cheap to clone
#[derive(Clone)]
pub struct ReadAloud {
    inner: Arc<ReaderInner>,
}

impl ReadAloud {
    /// Create a reader over `engine`.
    ///
    /// Must be called from within a tokio runtime; the driver task and all
    /// timers run on it.
    pub fn new(engine: Arc<dyn SpeechEngine>, settings: &Settings) -> Result<Self, PipelineError> {
        settings
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let runtime = Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scheduler = PlaybackScheduler::new_shared(engine, settings, runtime.clone(), events_tx);

        let driver = runtime.spawn(drive(Arc::downgrade(&scheduler), events_rx));

        Ok(Self {
            inner: Arc::new(ReaderInner {
                scheduler,
                driver: Mutex::new(Some(driver)),
            }),
        })
    }

    /// Read `text` aloud, or replay the last text when `None`
    pub fn speak(&self, text: Option<&str>) {
        self.inner.scheduler.lock().speak(text);
    }

    pub fn stop(&self) {
        self.inner.scheduler.lock().stop();
    }

    pub fn pause(&self) {
        self.inner.scheduler.lock().pause();
    }

    pub fn resume(&self) {
        self.inner.scheduler.lock().resume();
    }

    /// Cancel playback, stop the driver and ignore all later calls
    pub fn shutdown(&self) {
        self.inner.scheduler.lock().shutdown();
        if let Some(driver) = self.inner.driver.lock().take() {
            driver.abort();
        }
    }

    /// Voice used from the next utterance on
    pub fn set_voice(&self, voice: Option<VoiceHandle>) {
        self.inner.scheduler.lock().set_voice(voice);
    }

    /// Speaking rate used from the next utterance on
    pub fn set_rate(&self, rate: f32) {
        self.inner.scheduler.lock().set_rate(rate);
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.scheduler.lock().snapshot()
    }

    /// True while speaking or paused
    pub fn speaking(&self) -> bool {
        self.snapshot().speaking()
    }

    pub fn paused(&self) -> bool {
        self.snapshot().paused()
    }

    pub fn supported(&self) -> bool {
        self.inner.scheduler.lock().is_supported()
    }

    pub fn current_word(&self) -> Option<WordPosition> {
        self.inner.scheduler.lock().current_word().cloned()
    }

    /// Watch the latest playback snapshot
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.scheduler.lock().subscribe_state()
    }

    /// Subscribe to notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ReadAloudEvent> {
        self.inner.scheduler.lock().subscribe()
    }
}

/// Feed engine events into the scheduler one at a time
async fn drive(
    scheduler: Weak<Mutex<PlaybackScheduler>>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(scheduler) = scheduler.upgrade() else {
            break;
        };
        scheduler.lock().handle_event(event);
    }
    tracing::debug!("Engine event driver stopped");
}
