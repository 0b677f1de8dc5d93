//! Turn passes: the pipeline from a new chat message to committed events.
//!
//! One pass handles one message:
//! 1. Build the prior projection from the nearest snapshot
//! 2. Plan the turn (category flags, cadence)
//! 3. Per stage, check turn-dependent run conditions against the turn so far
//! 4. Fan out units (per character, per pair, per list) and call the generator
//! 5. Parse, validate, and map each response in plan order
//! 6. Fold accepted events into the turn projection for later stages
//! 7. Append the turn's events in one call and snapshot on cadence
//!
//! A failed, timed-out, or unparsable call contributes nothing and the pass
//! goes on. Cancellation abandons the turn: nothing is written.

use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use storyline_core::config::EngineConfig;
use storyline_core::extraction::{ConsolidationTarget, Extraction};
use storyline_core::validation::target_list;
use storyline_core::{
    Projection, ProjectionError, ValidationContext, ValidationRules, map_extraction,
    prior_projection, validate,
};
use storyline_store::{EventStore, Journal};
use storyline_types::{BranchPosition, CharacterState, Event, Relationship, Snapshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GenerationError, RunnerError};
use crate::extractor::{Extractor, Target};
use crate::generator::{GenerationRequest, Generator};
use crate::parse::{parse_extraction, parse_initial_state};
use crate::progress::{NoProgress, ProgressSink};
use crate::prompt::{INITIAL_TEMPLATE, PromptEngine};
use crate::scheduler::{Scheduler, expand_targets};
use crate::settings::Settings;
use crate::strategy::RunContext;
use crate::transcript::{ChatMessage, Transcript};

/// Temperature for the opening-scene call.
const INITIAL_TEMPERATURE: f32 = 0.3;

/// What a pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The turn was appended to the store.
    Committed {
        /// Events appended.
        events: usize,
        /// Whether a snapshot was written after the turn.
        snapshot: bool,
    },
    /// The pass was cancelled before commit. Nothing was written.
    Cancelled {
        /// Events the completed steps had produced.
        turn_events: Vec<Event>,
    },
    /// The branch has no snapshot yet. Nothing ran.
    NotInitialized,
    /// The message already has a recorded pass or snapshot.
    AlreadyExtracted,
    /// Re-extraction reached back to the opening message and re-seeded it.
    Initialized {
        /// Characters in the seeded scene.
        characters: usize,
    },
}

/// What chat initialization did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A seed snapshot was written.
    Seeded {
        /// Characters in the seeded scene.
        characters: usize,
    },
    /// The branch already had a snapshot.
    AlreadyInitialized,
    /// Cancelled before the seed was written.
    Cancelled,
}

/// Runs extraction passes against one generator.
pub struct TurnRunner<G> {
    generator: G,
    prompts: PromptEngine,
    scheduler: Scheduler,
    settings: Settings,
    rules: ValidationRules,
    request_timeout: Duration,
    max_concurrent_calls: usize,
    max_window_messages: u32,
    snapshot_interval: usize,
    progress: Box<dyn ProgressSink>,
}

/// One generator call planned for a stage.
struct Unit<'r> {
    extractor: &'r Extractor,
    target: Target,
    request: GenerationRequest,
}

/// The list a consolidation unit rewrites, as templates see it.
#[derive(Serialize)]
struct ListContext<'a> {
    description: String,
    entries: &'a [String],
    min: usize,
    max: usize,
}

/// Everything an extractor template can reference.
#[derive(Serialize)]
struct PromptContext<'a> {
    extractor: &'a str,
    target: String,
    message_id: u32,
    messages: &'a [ChatMessage],
    present: Vec<String>,
    worn: Vec<&'a String>,
    state: &'a Snapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    character: Option<&'a CharacterState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pair: Option<&'a Relationship>,
    #[serde(skip_serializing_if = "Option::is_none")]
    list: Option<ListContext<'a>>,
}

impl<G: Generator> TurnRunner<G> {
    /// Create a runner with the built-in registry.
    pub fn new(generator: G, prompts: PromptEngine, config: &EngineConfig, settings: Settings) -> Self {
        Self {
            generator,
            prompts,
            scheduler: Scheduler::with_defaults(&config.scheduler),
            settings,
            rules: ValidationRules {
                min_chapter_messages: config.chapters.min_messages,
                consolidation: config.consolidation,
            },
            request_timeout: Duration::from_millis(config.llm.request_timeout_ms),
            max_concurrent_calls: config.llm.max_concurrent_calls.max(1),
            max_window_messages: config.scheduler.max_window_messages,
            snapshot_interval: config.store.snapshot_interval_events.max(1),
            progress: Box::new(NoProgress),
        }
    }

    /// Report section progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    /// Replace the extractor registry.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The generator this runner calls.
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Seed the branch at `position` from the opening messages.
    ///
    /// A failed or unparsable call still seeds an empty world so later
    /// passes can run.
    pub async fn initialize<J: Journal>(
        &self,
        store: &mut EventStore<J>,
        transcript: &Transcript,
        position: BranchPosition,
        cancel: &CancellationToken,
    ) -> Result<InitOutcome, RunnerError> {
        store.activate(position)?;
        if store.nearest_snapshot(position)?.is_some() {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let empty = Projection::from_snapshot(Snapshot::empty(position));
        let window = transcript.window(position.message_id, self.max_window_messages);
        let context = serde_json::to_value(PromptContext {
            extractor: INITIAL_TEMPLATE,
            target: "scene".to_owned(),
            message_id: position.message_id,
            messages: window,
            present: Vec::new(),
            worn: Vec::new(),
            state: empty.snapshot(),
            character: None,
            pair: None,
            list: None,
        })?;
        let rendered = self.prompts.render(INITIAL_TEMPLATE, &context)?;
        let request = GenerationRequest {
            extractor: INITIAL_TEMPLATE.to_owned(),
            system: rendered.system,
            prompt: rendered.user,
            temperature: INITIAL_TEMPERATURE,
        };

        let response = self.call(&request, "scene", cancel).await;
        if cancel.is_cancelled() {
            info!(%position, "initialization cancelled");
            return Ok(InitOutcome::Cancelled);
        }

        let extractions = match response.as_deref().map(parse_initial_state) {
            Some(Ok(extractions)) => extractions,
            Some(Err(e)) => {
                warn!(%position, error = %e, "failed to parse initial state, seeding empty world");
                Vec::new()
            }
            None => {
                warn!(%position, "no initial state, seeding empty world");
                Vec::new()
            }
        };

        let mut current = empty.clone();
        for extraction in extractions {
            let ctx = ValidationContext {
                prior: &empty,
                current: &current,
                position,
                rules: self.rules,
            };
            if let Some(valid) = validate(extraction, &ctx) {
                for event in map_extraction(&valid, position) {
                    current.apply(&event);
                }
            }
        }

        let snapshot = current.at(position).into_snapshot();
        let characters = snapshot.characters.len();
        store.put_snapshot(snapshot)?;
        info!(%position, characters, "chat initialized");
        Ok(InitOutcome::Seeded { characters })
    }

    /// Extract the message at `position` and commit its events.
    pub async fn run_pass<J: Journal>(
        &self,
        store: &mut EventStore<J>,
        transcript: &Transcript,
        position: BranchPosition,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, RunnerError> {
        store.activate(position)?;
        let prior = match prior_projection(store, position) {
            Ok(prior) => prior,
            Err(ProjectionError::NoSnapshot { .. }) => {
                debug!(%position, "branch not initialized, skipping pass");
                return Ok(PassOutcome::NotInitialized);
            }
            Err(e) => return Err(e.into()),
        };
        if store.has_entries_at(position) {
            debug!(%position, "message already extracted");
            return Ok(PassOutcome::AlreadyExtracted);
        }

        let plan = self.scheduler.plan(position, &self.settings);
        info!(%position, planned = plan.steps().len(), "starting pass");

        let mut current = prior.clone();
        let mut turn_events: Vec<Event> = Vec::new();

        for (stage, extractors) in plan.sections() {
            if cancel.is_cancelled() {
                return Ok(Self::cancelled(position, turn_events));
            }

            let ctx = RunContext {
                position,
                prior: &prior,
                current: &current,
                turn_events: &turn_events,
            };
            let active: Vec<&Extractor> = extractors
                .iter()
                .copied()
                .filter(|e| e.should_run(&self.settings, &ctx))
                .collect();
            if active.is_empty() {
                continue;
            }

            self.progress.section_started(stage, active.len());
            let units = self.prepare_units(&active, &prior, &current, transcript, position);
            let responses: Vec<Option<String>> = futures::stream::iter(
                units
                    .iter()
                    .map(|unit| self.call(&unit.request, unit.target.to_string(), cancel)),
            )
            .buffered(self.max_concurrent_calls)
            .collect()
            .await;

            if cancel.is_cancelled() {
                return Ok(Self::cancelled(position, turn_events));
            }

            let before = turn_events.len();
            for (unit, response) in units.iter().zip(responses) {
                let Some(raw) = response else { continue };
                let Some(extraction) = Self::parse_unit(unit, &raw) else {
                    continue;
                };
                let ctx = ValidationContext {
                    prior: &prior,
                    current: &current,
                    position,
                    rules: self.rules,
                };
                let Some(valid) = validate(extraction, &ctx) else {
                    debug!(
                        extractor = unit.extractor.name(),
                        target = %unit.target,
                        "output already reflected in state"
                    );
                    continue;
                };
                let events = map_extraction(&valid, position);
                for event in &events {
                    current.apply(event);
                }
                debug!(
                    extractor = unit.extractor.name(),
                    target = %unit.target,
                    events = events.len(),
                    "extractor produced events"
                );
                turn_events.extend(events);
            }
            self.progress
                .section_completed(stage, turn_events.len().saturating_sub(before));
        }

        if cancel.is_cancelled() {
            return Ok(Self::cancelled(position, turn_events));
        }

        let events = turn_events.len();
        store.append(position, turn_events)?;

        let snapshot = store.events_since_snapshot(position)? >= self.snapshot_interval;
        if snapshot {
            store.put_snapshot(current.into_snapshot())?;
        }
        info!(%position, events, snapshot, "pass committed");
        Ok(PassOutcome::Committed { events, snapshot })
    }

    /// Drop everything recorded from `position` onward and extract it again.
    pub async fn reextract<J: Journal>(
        &self,
        store: &mut EventStore<J>,
        transcript: &Transcript,
        position: BranchPosition,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, RunnerError> {
        store.activate(position)?;
        store.truncate(position.message_id)?;
        if store.nearest_snapshot(position)?.is_none() {
            return match self.initialize(store, transcript, position, cancel).await? {
                InitOutcome::Seeded { characters } => Ok(PassOutcome::Initialized { characters }),
                InitOutcome::Cancelled => Ok(PassOutcome::Cancelled {
                    turn_events: Vec::new(),
                }),
                InitOutcome::AlreadyInitialized => {
                    self.run_pass(store, transcript, position, cancel).await
                }
            };
        }
        self.run_pass(store, transcript, position, cancel).await
    }

    fn cancelled(position: BranchPosition, turn_events: Vec<Event>) -> PassOutcome {
        info!(%position, produced = turn_events.len(), "pass cancelled, nothing committed");
        PassOutcome::Cancelled { turn_events }
    }

    /// Render one request per fan-out unit of every active extractor.
    fn prepare_units<'r>(
        &self,
        active: &[&'r Extractor],
        prior: &Projection,
        current: &Projection,
        transcript: &Transcript,
        position: BranchPosition,
    ) -> Vec<Unit<'r>> {
        let mut units = Vec::new();
        for &extractor in active {
            let len = extractor
                .message_strategy
                .window_len(position, prior, self.max_window_messages);
            let window = transcript.window(position.message_id, len);
            let temperature = self.settings.temperature(extractor);

            for target in expand_targets(extractor, current, self.rules.consolidation) {
                let rendered = prompt_context(extractor, &target, current, window, self.rules)
                    .and_then(|context| self.prompts.render_extractor(extractor.kind, &context));
                match rendered {
                    Ok(prompt) => units.push(Unit {
                        extractor,
                        request: GenerationRequest {
                            extractor: extractor.name().to_owned(),
                            system: prompt.system,
                            prompt: prompt.user,
                            temperature,
                        },
                        target,
                    }),
                    Err(e) => warn!(
                        extractor = extractor.name(),
                        target = %target,
                        error = %e,
                        "failed to render prompt, skipping"
                    ),
                }
            }
        }
        units
    }

    /// Call the generator under the per-call deadline.
    async fn call(
        &self,
        request: &GenerationRequest,
        target: impl core::fmt::Display,
        cancel: &CancellationToken,
    ) -> Option<String> {
        match timeout(self.request_timeout, self.generator.generate(request, cancel)).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(GenerationError::Cancelled)) => {
                debug!(extractor = %request.extractor, target = %target, "generation cancelled");
                None
            }
            Ok(Err(e)) => {
                warn!(
                    extractor = %request.extractor,
                    target = %target,
                    error = %e,
                    "generation failed, extractor contributes nothing"
                );
                None
            }
            Err(_) => {
                warn!(
                    extractor = %request.extractor,
                    target = %target,
                    timeout_ms = self.request_timeout.as_millis(),
                    "generation timed out, extractor contributes nothing"
                );
                None
            }
        }
    }

    fn parse_unit(unit: &Unit<'_>, raw: &str) -> Option<Extraction> {
        match parse_extraction(unit.extractor.kind, &unit.target, raw) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(
                    extractor = unit.extractor.name(),
                    target = %unit.target,
                    error = %e,
                    raw_response = raw,
                    "failed to parse response"
                );
                None
            }
        }
    }
}

/// Template context for one fan-out unit.
fn prompt_context(
    extractor: &Extractor,
    target: &Target,
    current: &Projection,
    window: &[ChatMessage],
    rules: ValidationRules,
) -> Result<serde_json::Value, RunnerError> {
    let (character, pair, list) = match target {
        Target::Scene => (None, None, None),
        Target::Character(name) => (current.character(name), None, None),
        Target::Pair { a, b } => (None, current.relationship(a, b), None),
        Target::List(list) => {
            let character = match list {
                ConsolidationTarget::Mood { character } | ConsolidationTarget::Physical { character } => {
                    current.character(character)
                }
                ConsolidationTarget::Feelings { from, .. } | ConsolidationTarget::Wants { from, .. } => {
                    current.character(from)
                }
            };
            let pair = match list {
                ConsolidationTarget::Feelings { from, to } | ConsolidationTarget::Wants { from, to } => {
                    current.relationship(from, to)
                }
                _ => None,
            };
            let context = ListContext {
                description: describe_list(list),
                entries: target_list(current, list).unwrap_or_default(),
                min: rules.consolidation.min_entries,
                max: rules.consolidation.max_entries,
            };
            (character, pair, Some(context))
        }
    };

    Ok(serde_json::to_value(PromptContext {
        extractor: extractor.name(),
        target: target.to_string(),
        message_id: current.position().message_id,
        messages: window,
        present: current.character_names(),
        worn: current.worn_items().collect(),
        state: current.snapshot(),
        character,
        pair,
        list,
    })?)
}

fn describe_list(list: &ConsolidationTarget) -> String {
    match list {
        ConsolidationTarget::Mood { character } => format!("moods for {character}"),
        ConsolidationTarget::Physical { character } => format!("physical states for {character}"),
        ConsolidationTarget::Feelings { from, to } => format!("feelings {from} has toward {to}"),
        ConsolidationTarget::Wants { from, to } => format!("things {from} wants from {to}"),
    }
}
