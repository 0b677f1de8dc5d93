//! The extractor registry.
//!
//! An [`Extractor`] is data: a kind, the feature category that gates it,
//! the pipeline [`Stage`] it belongs to, its fan-out [`Shape`], a default
//! temperature, and its two policies. Prompting, parsing, validation, and
//! mapping are selected by [`ExtractorKind`] in the pass.

use serde::{Deserialize, Serialize};
use storyline_core::config::SchedulerConfig;
use storyline_core::extraction::ConsolidationTarget;
use storyline_types::EventKind;

use crate::settings::Settings;
use crate::strategy::{Condition, MessageStrategy, RunContext, RunStrategy, WindowAnchor};

/// Feature flag group an extractor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// In-story clock.
    Time,
    /// Scene location.
    Location,
    /// Weather.
    Climate,
    /// Topic, tone, and tension.
    Scene,
    /// Presence and per-character state.
    Characters,
    /// Clothing.
    Outfits,
    /// Scene props.
    Props,
    /// Pairs and their attitudes.
    Relationships,
    /// Story beats.
    Narrative,
    /// Chapter boundaries.
    Chapters,
    /// List consolidation.
    Consolidation,
}

/// Pipeline stage. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Time, location, climate, topic/tone, tension.
    Core,
    /// Arrivals and departures.
    Presence,
    /// Per-character fan-out.
    Character,
    /// Props, after outfits so worn items are known.
    Props,
    /// New pairs worth tracking.
    RelationshipSubjects,
    /// Per-pair fan-out.
    Pair,
    /// Story beats.
    Narrative,
    /// Chapter boundaries.
    Chapter,
    /// Periodic list consolidation.
    Consolidation,
}

impl Stage {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Presence => "presence",
            Self::Character => "character",
            Self::Props => "props",
            Self::RelationshipSubjects => "relationship_subjects",
            Self::Pair => "pair",
            Self::Narrative => "narrative",
            Self::Chapter => "chapter",
            Self::Consolidation => "consolidation",
        }
    }
}

/// How an extractor fans out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Once per message.
    Global,
    /// Once per present character.
    PerCharacter,
    /// Once per established pair with both members present.
    PerPair,
}

/// Closed set of extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Elapsed time or an explicit jump.
    Time,
    /// Scene location.
    Location,
    /// Weather.
    Climate,
    /// Topic and tone.
    TopicTone,
    /// Tension reading.
    Tension,
    /// Arrivals and departures.
    Presence,
    /// Where a character is.
    Position,
    /// What a character is doing.
    Activity,
    /// A character's moods.
    Mood,
    /// A character's physical state.
    Physical,
    /// A character's clothing.
    Outfit,
    /// A newly arrived character's profile.
    Profile,
    /// Scene props.
    Props,
    /// Pairs worth tracking.
    RelationshipSubjects,
    /// Feelings within a pair.
    Feelings,
    /// Secrets within a pair.
    Secrets,
    /// Wants within a pair.
    Wants,
    /// A pair's status.
    Status,
    /// Story beats.
    Narrative,
    /// Chapter boundaries.
    Chapter,
    /// Collapse a character's moods.
    MoodConsolidation,
    /// Collapse a character's physical states.
    PhysicalConsolidation,
    /// Collapse a direction's feelings.
    FeelingsConsolidation,
    /// Collapse a direction's wants.
    WantsConsolidation,
}

impl ExtractorKind {
    /// Every kind, in registry order.
    pub const ALL: [Self; 24] = [
        Self::Time,
        Self::Location,
        Self::Climate,
        Self::TopicTone,
        Self::Tension,
        Self::Presence,
        Self::Position,
        Self::Activity,
        Self::Mood,
        Self::Physical,
        Self::Outfit,
        Self::Profile,
        Self::Props,
        Self::RelationshipSubjects,
        Self::Feelings,
        Self::Secrets,
        Self::Wants,
        Self::Status,
        Self::Narrative,
        Self::Chapter,
        Self::MoodConsolidation,
        Self::PhysicalConsolidation,
        Self::FeelingsConsolidation,
        Self::WantsConsolidation,
    ];

    /// Stable name, also the template name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Location => "location",
            Self::Climate => "climate",
            Self::TopicTone => "topic_tone",
            Self::Tension => "tension",
            Self::Presence => "presence",
            Self::Position => "position",
            Self::Activity => "activity",
            Self::Mood => "mood",
            Self::Physical => "physical",
            Self::Outfit => "outfit",
            Self::Profile => "profile",
            Self::Props => "props",
            Self::RelationshipSubjects => "relationship_subjects",
            Self::Feelings => "feelings",
            Self::Secrets => "secrets",
            Self::Wants => "wants",
            Self::Status => "status",
            Self::Narrative => "narrative",
            Self::Chapter => "chapter",
            Self::MoodConsolidation => "mood_consolidation",
            Self::PhysicalConsolidation => "physical_consolidation",
            Self::FeelingsConsolidation => "feelings_consolidation",
            Self::WantsConsolidation => "wants_consolidation",
        }
    }
}

impl core::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one fan-out unit is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The scene as a whole.
    Scene,
    /// One character, by display name.
    Character(String),
    /// One established pair.
    Pair {
        /// First member.
        a: String,
        /// Second member.
        b: String,
    },
    /// One list due for consolidation.
    List(ConsolidationTarget),
}

impl core::fmt::Display for Target {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Scene => f.write_str("scene"),
            Self::Character(name) => f.write_str(name),
            Self::Pair { a, b } => write!(f, "{a}/{b}"),
            Self::List(ConsolidationTarget::Mood { character }) => write!(f, "{character} mood"),
            Self::List(ConsolidationTarget::Physical { character }) => {
                write!(f, "{character} physical")
            }
            Self::List(ConsolidationTarget::Feelings { from, to }) => {
                write!(f, "{from}->{to} feelings")
            }
            Self::List(ConsolidationTarget::Wants { from, to }) => write!(f, "{from}->{to} wants"),
        }
    }
}

/// One registered extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Extractor {
    /// Which extractor.
    pub kind: ExtractorKind,
    /// Feature flag group.
    pub category: Category,
    /// Pipeline stage.
    pub stage: Stage,
    /// Fan-out shape.
    pub shape: Shape,
    /// Temperature unless settings override it.
    pub default_temperature: f32,
    /// Chat window policy.
    pub message_strategy: MessageStrategy,
    /// Firing policy.
    pub run_strategy: RunStrategy,
}

impl Extractor {
    /// Stable name.
    pub const fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Template rendered for this extractor.
    pub const fn template(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Category enabled and run strategy satisfied.
    pub fn should_run(&self, settings: &Settings, ctx: &RunContext<'_>) -> bool {
        settings.is_enabled(self.category) && self.run_strategy.should_run(ctx)
    }

    /// Registry entry for `kind`.
    pub fn builtin(kind: ExtractorKind, config: &SchedulerConfig) -> Self {
        use ExtractorKind as K;

        let (category, stage, shape) = match kind {
            K::Time => (Category::Time, Stage::Core, Shape::Global),
            K::Location => (Category::Location, Stage::Core, Shape::Global),
            K::Climate => (Category::Climate, Stage::Core, Shape::Global),
            K::TopicTone | K::Tension => (Category::Scene, Stage::Core, Shape::Global),
            K::Presence => (Category::Characters, Stage::Presence, Shape::Global),
            K::Position | K::Activity | K::Mood | K::Physical | K::Profile => {
                (Category::Characters, Stage::Character, Shape::PerCharacter)
            }
            K::Outfit => (Category::Outfits, Stage::Character, Shape::PerCharacter),
            K::Props => (Category::Props, Stage::Props, Shape::Global),
            K::RelationshipSubjects => (
                Category::Relationships,
                Stage::RelationshipSubjects,
                Shape::Global,
            ),
            K::Feelings | K::Secrets | K::Wants | K::Status => {
                (Category::Relationships, Stage::Pair, Shape::PerPair)
            }
            K::Narrative => (Category::Narrative, Stage::Narrative, Shape::Global),
            K::Chapter => (Category::Chapters, Stage::Chapter, Shape::Global),
            K::MoodConsolidation | K::PhysicalConsolidation => (
                Category::Consolidation,
                Stage::Consolidation,
                Shape::PerCharacter,
            ),
            K::FeelingsConsolidation | K::WantsConsolidation => {
                (Category::Consolidation, Stage::Consolidation, Shape::PerPair)
            }
        };

        let message_strategy = match kind {
            K::Time | K::Position | K::Activity => MessageStrategy::FixedNumber(2),
            K::Location | K::Props => MessageStrategy::SinceLastEventOfKind(vec![EventKind::Location]),
            K::Climate => MessageStrategy::SinceLastEventOfKind(vec![EventKind::Climate]),
            K::TopicTone | K::Tension | K::RelationshipSubjects => MessageStrategy::FixedNumber(4),
            K::Presence | K::Mood | K::Physical | K::Outfit | K::Narrative => {
                MessageStrategy::FixedNumber(3)
            }
            K::Profile | K::Feelings | K::Secrets | K::Wants | K::Status => {
                MessageStrategy::FixedNumber(6)
            }
            K::Chapter => MessageStrategy::Custom {
                description: "messages since the last chapter boundary".to_owned(),
                anchor: WindowAnchor::LastChapterEnd,
                min: 4,
                max: 40,
            },
            K::MoodConsolidation
            | K::PhysicalConsolidation
            | K::FeelingsConsolidation
            | K::WantsConsolidation => MessageStrategy::FixedNumber(1),
        };

        let run_strategy = match kind {
            K::Profile => RunStrategy::Custom {
                description: "a character appeared this turn".to_owned(),
                condition: Condition::TurnProduced(vec!["character/appeared".to_owned()]),
            },
            K::RelationshipSubjects => RunStrategy::Custom {
                description: "two or more characters present".to_owned(),
                condition: Condition::PresentCharactersAtLeast(2),
            },
            K::Chapter => RunStrategy::Custom {
                description: "scene moved, time jumped, or a beat was recorded".to_owned(),
                condition: Condition::TurnProduced(vec![
                    "location/moved".to_owned(),
                    "time/set".to_owned(),
                    "narrative/beat_recorded".to_owned(),
                ]),
            },
            K::MoodConsolidation
            | K::PhysicalConsolidation
            | K::FeelingsConsolidation
            | K::WantsConsolidation => RunStrategy::EveryNMessages {
                n: config.consolidation_every,
                offset: config.consolidation_offset,
            },
            _ => RunStrategy::EveryMessage,
        };

        let default_temperature = match kind {
            K::Narrative | K::Chapter | K::Profile => 0.5,
            K::MoodConsolidation
            | K::PhysicalConsolidation
            | K::FeelingsConsolidation
            | K::WantsConsolidation => 0.2,
            _ => 0.3,
        };

        Self {
            kind,
            category,
            stage,
            shape,
            default_temperature,
            message_strategy,
            run_strategy,
        }
    }
}

/// Every built-in extractor, in stage order.
pub fn default_registry(config: &SchedulerConfig) -> Vec<Extractor> {
    ExtractorKind::ALL
        .into_iter()
        .map(|kind| Extractor::builtin(kind, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_in_stage_order() {
        let registry = default_registry(&SchedulerConfig::default());
        assert_eq!(registry.len(), ExtractorKind::ALL.len());
        assert!(registry.windows(2).all(|w| match w {
            [a, b] => a.stage <= b.stage,
            _ => true,
        }));
    }

    #[test]
    fn props_run_after_outfits_and_pairs_after_subjects() {
        let stage = |kind| Extractor::builtin(kind, &SchedulerConfig::default()).stage;
        assert!(stage(ExtractorKind::Outfit) < stage(ExtractorKind::Props));
        assert!(stage(ExtractorKind::Presence) < stage(ExtractorKind::Outfit));
        assert!(stage(ExtractorKind::RelationshipSubjects) < stage(ExtractorKind::Feelings));
        assert!(stage(ExtractorKind::Narrative) < stage(ExtractorKind::Chapter));
    }

    #[test]
    fn consolidation_follows_configured_cadence() {
        let config = SchedulerConfig {
            consolidation_every: 6,
            consolidation_offset: 0,
            ..SchedulerConfig::default()
        };
        let extractor = Extractor::builtin(ExtractorKind::MoodConsolidation, &config);
        assert_eq!(
            extractor.run_strategy,
            RunStrategy::EveryNMessages { n: 6, offset: 0 }
        );
        assert!(extractor.run_strategy.may_run(12));
        assert!(!extractor.run_strategy.may_run(13));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = ExtractorKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ExtractorKind::ALL.len());
    }
}
