//! Error types for the event store.
//!
//! Every variant here signals either a caller bug (stale position, reused
//! id) or a persistence failure. Callers treat them as fatal for the pass.

use storyline_types::{BranchPosition, EventId};

/// Errors that can occur in the event store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The position's swipe is not the active one for its message, or the
    /// message was dropped when another swipe was selected.
    #[error("no active branch at {position}")]
    NoActiveBranch {
        /// The stale position.
        position: BranchPosition,
    },

    /// An event's source does not match the position it is appended at.
    #[error("event {id} has source {found}, expected {expected}")]
    SourceMismatch {
        /// The offending event.
        id: EventId,
        /// Position passed to `append`.
        expected: BranchPosition,
        /// Source recorded on the event.
        found: BranchPosition,
    },

    /// An event id is already in the log.
    #[error("duplicate event id {id}")]
    DuplicateEvent {
        /// The reused id.
        id: EventId,
    },

    /// Reading or writing the journal failed.
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A journal record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A journal line in the middle of the file is unreadable.
    #[error("corrupt journal record at line {line}: {source}")]
    CorruptJournal {
        /// One-based line number.
        line: usize,
        /// The decode error.
        source: serde_json::Error,
    },
}
