//! Error types for the pass runner.
//!
//! [`GenerationError`] covers a single call to the text generator and is
//! never fatal to a pass. [`RunnerError`] is what surfaces to the caller:
//! configuration, templates, and store corruption.

use storyline_core::{ConfigError, ProjectionError};
use storyline_store::StoreError;

/// Failure of one generation call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The response did not contain any text.
    #[error("response missing {0}")]
    MissingContent(&'static str),

    /// The pass was cancelled while the call was in flight.
    #[error("cancelled")]
    Cancelled,
}

/// Errors that can occur during runner operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Environment or file configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Engine configuration could not be loaded.
    #[error(transparent)]
    Engine(#[from] ConfigError),

    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// A generator response could not be parsed.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The transcript file is unreadable or malformed.
    #[error("transcript error: {0}")]
    Transcript(String),

    /// The event store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The projection could not be built for a reason other than a cold chat.
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
