//! Integration tests for the read-aloud façade
//!
//! These drive `ReadAloud` end to end, through the event driver task, against
//! a recording engine and the simulated engine.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;

use read_aloud_config::{Settings, SimulationConfig};
use read_aloud_core::{
    BoundaryKind, EngineError, EngineErrorKind, PlaybackState, SpeechEngine, Utterance,
    UtteranceEvents, VoiceHandle,
};
use read_aloud_pipeline::{ReadAloud, ReadAloudEvent, SimulatedEngine};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Speak(String),
    Cancel,
    Pause,
    Resume,
}

/// Engine that records every call and hands its event sinks to the test
struct RecordingEngine {
    available: bool,
    calls: Mutex<Vec<Call>>,
    sinks: Mutex<Vec<UtteranceEvents>>,
    utterances: Mutex<Vec<Utterance>>,
}

impl RecordingEngine {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            calls: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            utterances: Mutex::new(Vec::new()),
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            calls: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            utterances: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn sink(&self) -> UtteranceEvents {
        self.sinks.lock().last().cloned().expect("no utterance spoken")
    }

    fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Speak(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl SpeechEngine for RecordingEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&self, utterance: Utterance, events: UtteranceEvents) -> Result<(), EngineError> {
        self.calls.lock().push(Call::Speak(utterance.text.clone()));
        self.utterances.lock().push(utterance);
        self.sinks.lock().push(events);
        Ok(())
    }

    fn cancel(&self) -> Result<(), EngineError> {
        self.calls.lock().push(Call::Cancel);
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.calls.lock().push(Call::Pause);
        Ok(())
    }

    fn resume(&self) -> Result<(), EngineError> {
        self.calls.lock().push(Call::Resume);
        Ok(())
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.playback.start_delay_ms = 0;
    settings.chunking.max_chunk_chars = 20;
    settings
}

/// Let the driver task drain pending engine events
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

const TWO_CHUNKS: &str = "Hello world. Second sentence here.";

/// Two speak calls: the engine sees cancel before the second utterance
#[tokio::test]
async fn test_cancel_precedes_every_speak() {
    let engine = RecordingEngine::new();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();

    reader.speak(Some("First text."));
    reader.speak(Some("Second text."));

    let calls = engine.calls();
    let second = calls
        .iter()
        .position(|c| *c == Call::Speak("Second text.".into()))
        .unwrap();
    assert_eq!(calls[second - 1], Call::Cancel);
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Speak(_))).count(),
        2
    );
}

/// Stop mid-chunk resets everything; the next speak starts from chunk 0
#[tokio::test]
async fn test_stop_resets_and_restarts_from_first_chunk() {
    let engine = RecordingEngine::new();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();

    reader.speak(Some(TWO_CHUNKS));
    engine.sink().started();
    engine.sink().ended();
    settle().await;
    engine.sink().started();
    engine.sink().boundary(BoundaryKind::Word, 0, None);
    settle().await;
    assert_eq!(reader.snapshot().current_chunk, 1);
    assert!(reader.current_word().is_some());

    reader.stop();
    reader.stop();
    let snapshot = reader.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(snapshot.current_chunk, 0);
    assert!(snapshot.current_word.is_none());
    assert!(!reader.speaking());

    reader.speak(None);
    assert_eq!(reader.snapshot().current_chunk, 0);
    assert_eq!(engine.spoken().last().map(String::as_str), Some("Hello world. "));
}

/// Engine error mid-utterance: Idle, one notification, nothing thrown
#[tokio::test(start_paused = true)]
async fn test_engine_error_mid_utterance() {
    let engine = RecordingEngine::new();
    let mut settings = settings();
    settings.playback.keep_alive_interval_ms = 1_000;
    let reader = ReadAloud::new(engine.clone(), &settings).unwrap();
    let mut events = reader.subscribe();

    reader.speak(Some(TWO_CHUNKS));
    engine.sink().started();
    settle().await;
    assert!(reader.speaking());

    engine.sink().failed(EngineErrorKind::Network);
    settle().await;
    assert_eq!(reader.snapshot().state, PlaybackState::Idle);
    assert!(reader.current_word().is_none());

    let calls_after_error = engine.calls().len();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.calls().len(), calls_after_error);

    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ReadAloudEvent::Error { message } = event {
            errors.push(message);
        }
    }
    assert_eq!(errors, vec!["The speech service could not be reached.".to_string()]);
}

/// A boundary too far from any word leaves the highlight alone
#[tokio::test]
async fn test_tolerance_rejection_keeps_word() {
    let engine = RecordingEngine::new();
    let mut settings = settings();
    settings.chunking.max_chunk_chars = 500;
    let reader = ReadAloud::new(engine.clone(), &settings).unwrap();

    reader.speak(Some("Short sentence."));
    engine.sink().started();
    engine.sink().boundary(BoundaryKind::Word, 6, Some(8));
    settle().await;
    let before = reader.current_word().unwrap();
    assert_eq!(before.word, "sentence.");

    // "sentence." ends at 15; 95 is 80 characters past it
    engine.sink().boundary(BoundaryKind::Word, 95, None);
    settle().await;
    assert_eq!(reader.current_word(), Some(before));
}

/// Events the engine emits after a cancel never chain or reset anything
#[tokio::test]
async fn test_stale_events_after_cancel() {
    let engine = RecordingEngine::new();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();

    reader.speak(Some(TWO_CHUNKS));
    let old = engine.sink();
    reader.speak(Some("Fresh text."));
    let fresh = engine.sink();
    fresh.started();
    settle().await;

    old.failed(EngineErrorKind::Canceled);
    old.ended();
    settle().await;

    assert_eq!(reader.snapshot().state, PlaybackState::Speaking);
    assert_eq!(engine.spoken(), vec!["Hello world. ", "Fresh text."]);
}

/// Keep-alive nudges reach the engine but their echoes change nothing
#[tokio::test(start_paused = true)]
async fn test_keep_alive_nudges_are_invisible() {
    let engine = RecordingEngine::new();
    let mut settings = settings();
    settings.playback.keep_alive_interval_ms = 1_000;
    let reader = ReadAloud::new(engine.clone(), &settings).unwrap();
    let mut state = reader.subscribe_state();

    reader.speak(Some(TWO_CHUNKS));
    engine.sink().started();
    settle().await;
    state.borrow_and_update();

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let calls = engine.calls();
    assert_eq!(&calls[calls.len() - 2..], &[Call::Pause, Call::Resume]);

    engine.sink().paused();
    engine.sink().resumed();
    settle().await;

    assert!(!state.has_changed().unwrap());
    assert_eq!(reader.snapshot().state, PlaybackState::Speaking);
}

/// User pause and resume are reflected once the engine confirms them
#[tokio::test]
async fn test_pause_resume_round_trip() {
    let engine = RecordingEngine::new();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();

    reader.pause();
    assert!(engine.calls().is_empty());

    reader.speak(Some(TWO_CHUNKS));
    engine.sink().started();
    settle().await;

    reader.pause();
    engine.sink().paused();
    settle().await;
    assert!(reader.paused());
    assert!(reader.speaking());

    reader.resume();
    engine.sink().resumed();
    settle().await;
    assert!(!reader.paused());
    assert_eq!(reader.snapshot().current_chunk, 0);
}

/// Without an engine every call is a no-op
#[tokio::test]
async fn test_unsupported_engine_is_noop() {
    let engine = RecordingEngine::unavailable();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();

    assert!(!reader.supported());
    reader.speak(Some(TWO_CHUNKS));
    reader.pause();
    reader.resume();
    reader.stop();
    reader.shutdown();

    assert!(engine.calls().is_empty());
    assert!(!reader.snapshot().supported);
    assert!(!reader.speaking());
}

/// Voice and rate changes apply to the next utterance
#[tokio::test]
async fn test_voice_and_rate_apply_to_next_utterance() {
    let engine = RecordingEngine::new();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();

    reader.speak(Some(TWO_CHUNKS));
    reader.set_rate(1.5);
    reader.set_voice(Some(VoiceHandle::new("en-GB")));
    engine.sink().started();
    engine.sink().ended();
    settle().await;

    let utterances = engine.utterances.lock().clone();
    assert_eq!(utterances.len(), 2);
    assert_eq!(utterances[0].rate, 1.0);
    assert!(utterances[0].voice.is_none());
    assert_eq!(utterances[1].rate, 1.5);
    assert_eq!(utterances[1].voice.as_ref().map(VoiceHandle::as_str), Some("en-GB"));
}

/// Dropping the last handle cancels the engine
#[tokio::test]
async fn test_drop_cancels_engine() {
    let engine = RecordingEngine::new();
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();
    let clone = reader.clone();

    reader.speak(Some(TWO_CHUNKS));
    drop(reader);
    assert_eq!(engine.calls().last(), Some(&Call::Speak("Hello world. ".into())));

    drop(clone);
    assert_eq!(engine.calls().last(), Some(&Call::Cancel));
}

/// Full run on the simulated engine: every chunk, every word, one at a time
#[tokio::test(start_paused = true)]
async fn test_simulated_engine_reads_to_the_end() {
    let engine = Arc::new(SimulatedEngine::new(SimulationConfig {
        words_per_minute: 600,
        ..Default::default()
    }));
    let mut settings = settings();
    settings.playback.start_delay_ms = 50;
    let reader = ReadAloud::new(engine.clone(), &settings).unwrap();
    let mut events = reader.subscribe();

    let text = "<p>Hello world.</p> This is a test. Of chunking behavior that runs long enough to exceed the limit.";
    reader.speak(Some(text));

    let mut words = Vec::new();
    let mut chunks = Vec::new();
    loop {
        match timeout(Duration::from_secs(60), events.recv()).await {
            Ok(Ok(ReadAloudEvent::WordChanged(position))) => words.push(position.word),
            Ok(Ok(ReadAloudEvent::ChunkStarted { index, total })) => chunks.push((index, total)),
            Ok(Ok(ReadAloudEvent::Finished)) => break,
            Ok(Ok(ReadAloudEvent::Error { message })) => panic!("unexpected error: {message}"),
            Ok(Ok(_)) => {}
            other => panic!("event stream ended: {other:?}"),
        }
    }

    assert_eq!(chunks, vec![(0, 3), (1, 3), (2, 3)]);
    assert_eq!(words.first().map(String::as_str), Some("Hello"));
    assert_eq!(words.last().map(String::as_str), Some("limit."));
    assert_eq!(words.len(), 17);
    assert_eq!(engine.max_concurrent(), 1);
    assert!(!reader.speaking());
}

/// Keep-alive nudges carry the simulated engine through its stall
#[tokio::test(start_paused = true)]
async fn test_keep_alive_defeats_stall() {
    let engine = Arc::new(SimulatedEngine::new(SimulationConfig {
        words_per_minute: 600,
        stall_after_ms: Some(1_500),
        ..Default::default()
    }));
    let mut settings = settings();
    settings.chunking.max_chunk_chars = 1_000;
    settings.playback.keep_alive_interval_ms = 1_000;
    let reader = ReadAloud::new(engine.clone(), &settings).unwrap();
    let mut events = reader.subscribe();

    let text = "word ".repeat(60);
    reader.speak(Some(&text));

    let finished = timeout(Duration::from_secs(120), async {
        loop {
            match events.recv().await {
                Ok(ReadAloudEvent::Finished) => return true,
                Ok(ReadAloudEvent::Error { .. }) | Err(_) => return false,
                Ok(_) => {}
            }
        }
    })
    .await;

    assert_eq!(finished, Ok(true));
    assert_eq!(engine.words_spoken(), 60);
}

/// Engine failure on the simulated engine is contained and reported
#[tokio::test(start_paused = true)]
async fn test_simulated_failure_is_contained() {
    let engine = Arc::new(SimulatedEngine::new(SimulationConfig {
        words_per_minute: 600,
        fail_after_words: Some(3),
        ..Default::default()
    }));
    let reader = ReadAloud::new(engine.clone(), &settings()).unwrap();
    let mut events = reader.subscribe();

    reader.speak(Some(TWO_CHUNKS));

    let message = timeout(Duration::from_secs(30), async {
        loop {
            if let Ok(ReadAloudEvent::Error { message }) = events.recv().await {
                return message;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(message, "Speech synthesis failed.");
    assert_eq!(reader.snapshot().state, PlaybackState::Idle);
}
