//! Error types for projection building.

use storyline_store::StoreError;
use storyline_types::BranchPosition;

/// Errors that can occur while building a projection.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The branch has never been initialized.
    ///
    /// Callers that only need prior state treat this as "nothing to do".
    #[error("no snapshot at or before {position}")]
    NoSnapshot {
        /// Position the projection was requested for.
        position: BranchPosition,
    },

    /// The store rejected the read (stale position).
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}
