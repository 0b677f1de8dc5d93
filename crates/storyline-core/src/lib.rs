//! Projection, validation, and event mapping for the storyline tracker.
//!
//! This crate turns committed events into world state and turns generator
//! output back into events:
//!
//! ```text
//!   EventStore ──► prior_projection ──► Projection ──┐
//!                                                    ▼
//!   Extraction ──► validate(prior, current) ──► map_extraction ──► Vec<Event>
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Engine configuration loaded from `storyline-config.yaml`.
//! - [`consolidation`] -- Normalization and bounds for list consolidation.
//! - [`error`] -- [`ProjectionError`].
//! - [`extraction`] -- Typed extractor output ([`Extraction`]).
//! - [`mapping`] -- Extraction to event conversion.
//! - [`projection`] -- Deterministic fold of snapshots and events.
//! - [`validation`] -- Dedup and filtering of extractor output.

pub mod config;
pub mod consolidation;
pub mod error;
pub mod extraction;
pub mod mapping;
pub mod projection;
pub mod validation;

pub use config::{ConfigError, EngineConfig};
pub use error::ProjectionError;
pub use extraction::{ConsolidationTarget, Extraction, ListChange};
pub use mapping::map_extraction;
pub use projection::{Projection, apply_event, prior_projection, project_with_turn_events};
pub use validation::{ValidationContext, ValidationRules, validate};
