//! Read-aloud CLI
//!
//! Plays a text or HTML file through the simulated engine and prints each
//! highlighted word as it is reached.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use read_aloud_config::{load_settings, Settings};
use read_aloud_core::VoiceHandle;
use read_aloud_pipeline::{ReadAloud, ReadAloudEvent, SimulatedEngine};

#[derive(Parser, Debug)]
#[command(name = "read-aloud")]
#[command(about = "Read a text file aloud with live word tracking", long_about = None)]
struct Cli {
    /// Text or HTML file to read
    file: PathBuf,

    /// Configuration file (layered over config/default and under READ_ALOUD__* variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Speaking rate (1.0 = normal)
    #[arg(short, long)]
    rate: Option<f32>,

    /// Chunk length ceiling in characters
    #[arg(long)]
    max_chunk_chars: Option<usize>,

    /// Voice name
    #[arg(long)]
    voice: Option<String>,

    /// Print notifications as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(max) = cli.max_chunk_chars {
        settings.chunking.max_chunk_chars = max;
    }

    init_tracing(&settings);

    let text = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let engine = Arc::new(SimulatedEngine::new(settings.simulation.clone()));
    let reader = ReadAloud::new(engine, &settings)?;
    if !reader.supported() {
        anyhow::bail!("Speech synthesis is not available");
    }
    if let Some(rate) = cli.rate {
        reader.set_rate(rate);
    }
    if let Some(voice) = cli.voice {
        reader.set_voice(Some(VoiceHandle::new(voice)));
    }

    tracing::info!(file = %cli.file.display(), "Reading aloud");
    let mut events = reader.subscribe();
    reader.speak(Some(&text));

    if !reader.speaking() && reader.snapshot().total_chunks == 0 {
        tracing::info!("Nothing to read");
        return Ok(());
    }

    let outcome = tokio::select! {
        outcome = play(&mut events, cli.json) => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping");
            Ok(())
        }
    };

    reader.shutdown();
    outcome
}

/// Print notifications until reading finishes or fails
async fn play(
    events: &mut tokio::sync::broadcast::Receiver<ReadAloudEvent>,
    json: bool,
) -> Result<()> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Output fell behind, notifications skipped");
                continue;
            }
            Err(RecvError::Closed) => return Ok(()),
        };

        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else if let ReadAloudEvent::WordChanged(position) = &event {
            println!("{:>6}  {}", position.start, position.word);
        }

        match event {
            ReadAloudEvent::Finished => return Ok(()),
            ReadAloudEvent::Error { message } => anyhow::bail!(message),
            _ => {}
        }
    }
}

/// Directives used when `RUST_LOG` is unset: every workspace crate at `level`
fn default_filter(level: &str) -> String {
    [
        "read_aloud",
        "read_aloud_config",
        "read_aloud_pipeline",
        "read_aloud_text_processing",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .collect::<Vec<_>>()
    .join(",")
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&settings.observability.log_level).into());

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
