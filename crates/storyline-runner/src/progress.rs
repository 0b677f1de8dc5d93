//! One-way progress signals for a host display.
//!
//! Sinks are advisory. A sink that drops signals never affects what a pass
//! commits.

use tracing::debug;

use crate::extractor::Stage;

/// Receives section start and completion signals.
pub trait ProgressSink: Send + Sync {
    /// A stage is about to run `extractors` extractors.
    fn section_started(&self, stage: Stage, extractors: usize);

    /// A stage finished and contributed `events` turn events.
    fn section_completed(&self, stage: Stage, events: usize);
}

/// Discards every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn section_started(&self, _stage: Stage, _extractors: usize) {}

    fn section_completed(&self, _stage: Stage, _events: usize) {}
}

/// Logs signals at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn section_started(&self, stage: Stage, extractors: usize) {
        debug!(stage = stage.as_str(), extractors, "section started");
    }

    fn section_completed(&self, stage: Stage, events: usize) {
        debug!(stage = stage.as_str(), events, "section completed");
    }
}
