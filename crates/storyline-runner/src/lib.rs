//! Extraction scheduling and pass running for the storyline tracker.
//!
//! The runner turns each new chat message into committed events by asking
//! a text generator narrow questions about the scene.
//!
//! # Architecture
//!
//! ```text
//! Transcript --> Scheduler --> Prompt Engine --> Generator --> Parser
//!                                                                |
//!        EventStore <-- append <-- map <-- validate <------------+
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Environment-driven runner configuration
//! - [`error`] -- [`RunnerError`] and [`GenerationError`]
//! - [`extractor`] -- The extractor registry
//! - [`generator`] -- The [`Generator`] seam and HTTP backends
//! - [`parse`] -- Response recovery and typed parsing
//! - [`pass`] -- [`TurnRunner`]: initialization, passes, re-extraction
//! - [`progress`] -- Section progress signals
//! - [`prompt`] -- Template loading and rendering
//! - [`scheduler`] -- Turn planning and fan-out
//! - [`settings`] -- Host settings (flags, temperatures, prompt overrides)
//! - [`strategy`] -- Run and message-window strategies
//! - [`transcript`] -- Chat transcript input

pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod parse;
pub mod pass;
pub mod progress;
pub mod prompt;
pub mod scheduler;
pub mod settings;
pub mod strategy;
pub mod transcript;

pub use error::{GenerationError, RunnerError};
pub use extractor::{Category, Extractor, ExtractorKind, Stage, Target};
pub use generator::{GenerationRequest, Generator, LlmBackend, create_backend};
pub use pass::{InitOutcome, PassOutcome, TurnRunner};
pub use progress::{NoProgress, ProgressSink, TracingProgress};
pub use prompt::PromptEngine;
pub use scheduler::{Plan, Scheduler};
pub use settings::Settings;
pub use transcript::{ChatMessage, Transcript};
