//! Shared type definitions for the storyline world tracker.
//!
//! This crate is the single source of truth for the data model: branch
//! positions, the closed event tag set, and materialized world state. Types
//! flow downstream to `TypeScript` via `ts-rs` for host UIs.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`position`] -- Branch positions (message + swipe)
//! - [`enums`] -- Event kinds, outfit slots, relationship and tension scales
//! - [`events`] -- Typed event payloads
//! - [`state`] -- Snapshot and its sub-states

pub mod enums;
pub mod events;
pub mod ids;
pub mod position;
pub mod state;

// Re-export all public types at crate root for convenience.
pub use enums::{
    EventKind, LocationType, OutfitSlot, RelationshipStatus, TensionDirection, TensionLevel,
    TensionType,
};
pub use events::{
    ChapterEvent, CharacterEvent, ClimateEvent, Event, EventBody, LocationEvent, NarrativeEvent,
    RelationshipEvent, SceneEvent, TimeEvent,
};
pub use ids::EventId;
pub use position::BranchPosition;
pub use state::{
    Attitude, Chapter, CharacterProfile, CharacterState, ClimateState, LocationState,
    NarrativeBeat, Outfit, PairKey, Relationship, SceneState, Snapshot, Tension, contains_folded,
    fold_key,
};
