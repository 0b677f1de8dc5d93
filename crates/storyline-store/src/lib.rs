//! Event storage for the storyline world tracker.
//!
//! # Architecture
//!
//! ```text
//! TurnRunner --append/put_snapshot--> EventStore --write-ahead--> Journal
//!                                          |                   (memory / JSON lines)
//!                                          +--nearest_snapshot / events_since--> Projection
//! ```
//!
//! - [`EventStore`] -- per-chat log keyed by branch position, with the
//!   active swipe map and snapshots.
//! - [`Journal`] -- durable ordered record sink; [`MemoryJournal`] and
//!   [`FileJournal`] implement it.
//! - [`StoreError`] -- data-corruption signals surfaced to callers.

pub mod error;
pub mod event_store;
pub mod journal;

pub use error::StoreError;
pub use event_store::EventStore;
pub use journal::{FileJournal, Journal, JournalRecord, MemoryJournal};
