//! Run and message-window policies for extractors.
//!
//! Both policies are plain data: a closed set of named strategies plus a
//! `Custom` variant that carries a serializable [`Condition`] instead of a
//! closure, so a schedule can be inspected, logged, and tested without
//! running anything.

use serde::{Deserialize, Serialize};
use storyline_core::Projection;
use storyline_types::{BranchPosition, Event, EventKind};

/// What a strategy may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    /// Message being extracted.
    pub position: BranchPosition,
    /// Committed state before this pass.
    pub prior: &'a Projection,
    /// Prior state plus turn events so far.
    pub current: &'a Projection,
    /// Events produced earlier in this pass.
    pub turn_events: &'a [Event],
}

/// A predicate over the pass state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// This pass produced an event with one of these `kind/subkind` tags.
    TurnProduced(Vec<String>),
    /// At least this many characters are present in the turn projection.
    PresentCharactersAtLeast(usize),
    /// The message id is at least this value.
    MessageAtLeast(u32),
    /// Every inner condition holds.
    All(Vec<Condition>),
    /// Any inner condition holds.
    Any(Vec<Condition>),
    /// The inner condition does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Evaluate against the pass state.
    pub fn holds(&self, ctx: &RunContext<'_>) -> bool {
        match self {
            Self::TurnProduced(tags) => ctx
                .turn_events
                .iter()
                .any(|event| tags.iter().any(|tag| *tag == event.tag())),
            Self::PresentCharactersAtLeast(n) => ctx.current.characters().count() >= *n,
            Self::MessageAtLeast(id) => ctx.position.message_id >= *id,
            Self::All(inner) => inner.iter().all(|c| c.holds(ctx)),
            Self::Any(inner) => inner.iter().any(|c| c.holds(ctx)),
            Self::Not(inner) => !inner.holds(ctx),
        }
    }

    /// Value decidable from the message id alone.
    ///
    /// `None` when the answer depends on turn events or presence.
    pub fn static_value(&self, message_id: u32) -> Option<bool> {
        match self {
            Self::TurnProduced(_) | Self::PresentCharactersAtLeast(_) => None,
            Self::MessageAtLeast(id) => Some(message_id >= *id),
            Self::All(inner) => {
                let values: Vec<Option<bool>> =
                    inner.iter().map(|c| c.static_value(message_id)).collect();
                if values.contains(&Some(false)) {
                    Some(false)
                } else if values.iter().all(|v| *v == Some(true)) {
                    Some(true)
                } else {
                    None
                }
            }
            Self::Any(inner) => {
                let values: Vec<Option<bool>> =
                    inner.iter().map(|c| c.static_value(message_id)).collect();
                if values.contains(&Some(true)) {
                    Some(true)
                } else if values.iter().all(|v| *v == Some(false)) {
                    Some(false)
                } else {
                    None
                }
            }
            Self::Not(inner) => inner.static_value(message_id).map(|v| !v),
        }
    }
}

/// Whether an extractor fires this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RunStrategy {
    /// Every message.
    EveryMessage,
    /// Messages where `(message_id - offset) mod n == 0`.
    EveryNMessages {
        /// Period. Zero never fires.
        n: u32,
        /// Phase.
        #[serde(default)]
        offset: u32,
    },
    /// A named condition.
    Custom {
        /// Human-readable summary for logs.
        description: String,
        /// The condition.
        condition: Condition,
    },
}

impl RunStrategy {
    /// Evaluate against the pass state.
    pub fn should_run(&self, ctx: &RunContext<'_>) -> bool {
        match self {
            Self::EveryMessage | Self::EveryNMessages { .. } => {
                self.may_run(ctx.position.message_id)
            }
            Self::Custom { condition, .. } => condition.holds(ctx),
        }
    }

    /// Whether the strategy can fire at `message_id` at all.
    ///
    /// Conditions on turn state count as possible; they are re-checked with
    /// [`Self::should_run`] right before the step executes.
    pub fn may_run(&self, message_id: u32) -> bool {
        match self {
            Self::EveryMessage => true,
            Self::EveryNMessages { n, offset } => message_id
                .checked_sub(*offset)
                .and_then(|delta| delta.checked_rem(*n))
                .is_some_and(|rem| rem == 0),
            Self::Custom { condition, .. } => condition.static_value(message_id) != Some(false),
        }
    }
}

/// Where a custom message window starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// The message after the last chapter boundary.
    LastChapterEnd,
    /// The first message of the chat.
    ChatStart,
}

/// How many trailing messages an extractor sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum MessageStrategy {
    /// The last `n` messages.
    FixedNumber(u32),
    /// Messages back to the last one that produced any of these kinds.
    SinceLastEventOfKind(Vec<EventKind>),
    /// Messages since an anchor, clamped to `[min, max]`.
    Custom {
        /// Human-readable summary for logs.
        description: String,
        /// Where the window starts.
        anchor: WindowAnchor,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
}

impl MessageStrategy {
    /// Number of messages ending at `position` to hand to the extractor.
    ///
    /// Always at least one. `cap` bounds the fixed and since-last windows;
    /// a custom window carries its own bounds.
    pub fn window_len(&self, position: BranchPosition, prior: &Projection, cap: u32) -> u32 {
        let cap = cap.max(1);
        let current = position.message_id;
        match self {
            Self::FixedNumber(n) => (*n).clamp(1, cap),
            Self::SinceLastEventOfKind(kinds) => prior
                .last_event_message(kinds)
                .map_or(cap, |last| span(last, current))
                .clamp(1, cap),
            Self::Custom {
                anchor, min, max, ..
            } => {
                let start = match anchor {
                    WindowAnchor::LastChapterEnd => prior
                        .last_chapter_end()
                        .map_or(0, |end| end.saturating_add(1)),
                    WindowAnchor::ChatStart => 0,
                };
                let lower = (*min).max(1);
                span(start, current).clamp(lower, (*max).max(lower))
            }
        }
    }
}

/// Inclusive message count from `start` to `end`.
const fn span(start: u32, end: u32) -> u32 {
    end.saturating_sub(start).saturating_add(1)
}
