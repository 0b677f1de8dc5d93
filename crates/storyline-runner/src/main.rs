//! Command-line entry point for the storyline tracker.
//!
//! Reads a chat transcript, replays the event journal, and extracts every
//! message that has not been extracted yet. The first message seeds the
//! world; later messages each get one pass.
//!
//! Ctrl-C cancels the pass in flight. Nothing from a cancelled pass is
//! written, so rerunning picks up where it stopped.

use anyhow::Context;
use storyline_core::EngineConfig;
use storyline_runner::config::RunnerConfig;
use storyline_runner::{
    InitOutcome, PassOutcome, PromptEngine, Settings, Transcript, TracingProgress, TurnRunner,
    create_backend,
};
use storyline_store::{EventStore, FileJournal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the transcript, or the journal cannot
/// be loaded, or if the store rejects a write.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RunnerConfig::from_env()?;
    let engine = if config.engine_config.exists() {
        EngineConfig::from_file(&config.engine_config)
            .with_context(|| format!("loading {}", config.engine_config.display()))?
    } else {
        EngineConfig::parse("")?
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&engine.logging.level)),
        )
        .with_target(true)
        .init();

    info!("storyline-runner starting");
    info!(
        engine_config = %config.engine_config.display(),
        transcript = %config.transcript.display(),
        journal = %config.journal.display(),
        snapshot_interval = engine.store.snapshot_interval_events,
        max_concurrent_calls = engine.llm.max_concurrent_calls,
        request_timeout_ms = engine.llm.request_timeout_ms,
        "configuration loaded"
    );

    let settings = match &config.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    let transcript = Transcript::from_file(&config.transcript)?;
    let mut store = EventStore::open(FileJournal::open(&config.journal)?)?;

    let prompts = PromptEngine::new(config.templates_dir.as_deref(), &settings)?;
    let backend = create_backend(&config.backend);
    info!(
        backend = backend.name(),
        model = config.backend.model,
        "generator configured"
    );

    let runner = TurnRunner::new(backend, prompts, &engine, settings).with_progress(TracingProgress);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let Some((first, rest)) = transcript.messages().split_first() else {
        info!("transcript is empty, nothing to do");
        return Ok(());
    };

    match runner
        .initialize(&mut store, &transcript, first.position(), &cancel)
        .await?
    {
        InitOutcome::Seeded { characters } => info!(characters, "world seeded"),
        InitOutcome::AlreadyInitialized => info!("world already seeded"),
        InitOutcome::Cancelled => return Ok(()),
    }

    let mut committed: usize = 0;
    let mut events: usize = 0;
    for message in rest {
        if cancel.is_cancelled() {
            break;
        }
        match runner
            .run_pass(&mut store, &transcript, message.position(), &cancel)
            .await?
        {
            PassOutcome::Committed { events: count, .. } => {
                committed = committed.saturating_add(1);
                events = events.saturating_add(count);
            }
            PassOutcome::Cancelled { .. } => break,
            PassOutcome::NotInitialized
            | PassOutcome::AlreadyExtracted
            | PassOutcome::Initialized { .. } => {}
        }
    }

    info!(
        messages = transcript.messages().len(),
        passes = committed,
        events,
        cancelled = cancel.is_cancelled(),
        "run complete"
    );
    Ok(())
}
