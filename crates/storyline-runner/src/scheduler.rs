//! Turn planning.
//!
//! The scheduler owns the registry in stage order and produces a [`Plan`]
//! for one message. Planning looks at the category flags and the message id
//! only; conditions over turn state are re-checked by the pass right before
//! each step, when earlier steps' events are known.

use storyline_core::Projection;
use storyline_core::config::{ConsolidationConfig, SchedulerConfig};
use storyline_core::consolidation::needs_consolidation;
use storyline_core::extraction::ConsolidationTarget;
use storyline_core::validation::target_list;
use storyline_types::BranchPosition;

use crate::extractor::{Extractor, ExtractorKind, Shape, Stage, Target, default_registry};
use crate::settings::Settings;

/// Orders extractors and plans turns.
#[derive(Debug, Clone)]
pub struct Scheduler {
    registry: Vec<Extractor>,
}

/// The extractors that may run for one message, in execution order.
#[derive(Debug, Clone)]
pub struct Plan<'r> {
    /// Message being extracted.
    pub position: BranchPosition,
    steps: Vec<&'r Extractor>,
}

impl Scheduler {
    /// A scheduler over `registry`, stably sorted into stage order.
    pub fn new(mut registry: Vec<Extractor>) -> Self {
        registry.sort_by_key(|e| e.stage);
        Self { registry }
    }

    /// A scheduler over every built-in extractor.
    pub fn with_defaults(config: &SchedulerConfig) -> Self {
        Self::new(default_registry(config))
    }

    /// Registered extractors in stage order.
    pub fn registry(&self) -> &[Extractor] {
        &self.registry
    }

    /// Plan the turn for `position`.
    pub fn plan(&self, position: BranchPosition, settings: &Settings) -> Plan<'_> {
        let steps = self
            .registry
            .iter()
            .filter(|e| {
                settings.is_enabled(e.category) && e.run_strategy.may_run(position.message_id)
            })
            .collect();
        Plan { position, steps }
    }
}

impl<'r> Plan<'r> {
    /// Planned extractors in execution order.
    pub fn steps(&self) -> &[&'r Extractor] {
        &self.steps
    }

    /// Whether nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps grouped by stage, in stage order.
    pub fn sections(&self) -> impl Iterator<Item = (Stage, &[&'r Extractor])> {
        self.steps
            .chunk_by(|a, b| a.stage == b.stage)
            .filter_map(|chunk| chunk.first().map(|first| (first.stage, chunk)))
    }
}

/// Fan-out units for `extractor` against the turn projection.
///
/// Per-character units cover present characters; per-pair units cover
/// established pairs with both members present. Consolidation extractors
/// expand to the lists that exceed the floor.
pub fn expand_targets(
    extractor: &Extractor,
    current: &Projection,
    bounds: ConsolidationConfig,
) -> Vec<Target> {
    let candidates: Vec<Target> = match (extractor.shape, extractor.kind) {
        (Shape::Global, _) => vec![Target::Scene],
        (Shape::PerCharacter, ExtractorKind::MoodConsolidation) => current
            .characters()
            .map(|c| {
                Target::List(ConsolidationTarget::Mood {
                    character: c.name.clone(),
                })
            })
            .collect(),
        (Shape::PerCharacter, ExtractorKind::PhysicalConsolidation) => current
            .characters()
            .map(|c| {
                Target::List(ConsolidationTarget::Physical {
                    character: c.name.clone(),
                })
            })
            .collect(),
        (Shape::PerCharacter, _) => current
            .characters()
            .map(|c| Target::Character(c.name.clone()))
            .collect(),
        (Shape::PerPair, ExtractorKind::FeelingsConsolidation) => current
            .present_relationships()
            .flat_map(|rel| [(&rel.a, &rel.b), (&rel.b, &rel.a)])
            .map(|(from, to)| {
                Target::List(ConsolidationTarget::Feelings {
                    from: from.clone(),
                    to: to.clone(),
                })
            })
            .collect(),
        (Shape::PerPair, ExtractorKind::WantsConsolidation) => current
            .present_relationships()
            .flat_map(|rel| [(&rel.a, &rel.b), (&rel.b, &rel.a)])
            .map(|(from, to)| {
                Target::List(ConsolidationTarget::Wants {
                    from: from.clone(),
                    to: to.clone(),
                })
            })
            .collect(),
        (Shape::PerPair, _) => current
            .present_relationships()
            .map(|rel| Target::Pair {
                a: rel.a.clone(),
                b: rel.b.clone(),
            })
            .collect(),
    };

    candidates
        .into_iter()
        .filter(|target| match target {
            Target::List(list) => {
                target_list(current, list).is_some_and(|entries| needs_consolidation(entries, bounds))
            }
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use storyline_types::{
        CharacterEvent, Event, EventBody, RelationshipEvent, RelationshipStatus, Snapshot,
    };

    use super::*;
    use crate::extractor::Category;

    const AT: BranchPosition = BranchPosition::new(3, 0);

    fn character(change: CharacterEvent) -> Event {
        Event::new(AT, EventBody::Character(change))
    }

    fn scene() -> Projection {
        let mut events = vec![
            character(CharacterEvent::Appeared {
                name: "Ada".to_owned(),
                position: None,
            }),
            character(CharacterEvent::Appeared {
                name: "Bo".to_owned(),
                position: None,
            }),
            character(CharacterEvent::Appeared {
                name: "Cy".to_owned(),
                position: None,
            }),
            Event::new(
                AT,
                EventBody::Relationship(RelationshipEvent::Established {
                    a: "Ada".to_owned(),
                    b: "Bo".to_owned(),
                    status: RelationshipStatus::Friendly,
                }),
            ),
        ];
        for mood in ["calm", "wary", "tired"] {
            events.push(character(CharacterEvent::MoodAdded {
                name: "Bo".to_owned(),
                value: mood.to_owned(),
            }));
        }
        Projection::fold(Snapshot::empty(AT), &events)
    }

    fn extractor(kind: ExtractorKind) -> Extractor {
        Extractor::builtin(kind, &SchedulerConfig::default())
    }

    #[test]
    fn plan_respects_flags_and_cadence() {
        let scheduler = Scheduler::with_defaults(&SchedulerConfig::default());
        let settings = Settings {
            categories: [(Category::Props, false)].into_iter().collect(),
            ..Settings::default()
        };

        let plan = scheduler.plan(BranchPosition::new(5, 0), &settings);
        let kinds: Vec<ExtractorKind> = plan.steps().iter().map(|e| e.kind).collect();
        assert!(!kinds.contains(&ExtractorKind::Props));
        assert!(!kinds.contains(&ExtractorKind::MoodConsolidation));
        assert!(kinds.contains(&ExtractorKind::Profile));

        let plan = scheduler.plan(BranchPosition::new(6, 0), &settings);
        assert!(plan.steps().iter().any(|e| e.kind == ExtractorKind::MoodConsolidation));
    }

    #[test]
    fn sections_follow_stage_order() {
        let scheduler = Scheduler::with_defaults(&SchedulerConfig::default());
        let plan = scheduler.plan(BranchPosition::new(6, 0), &Settings::default());
        let stages: Vec<Stage> = plan.sections().map(|(stage, _)| stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Core,
                Stage::Presence,
                Stage::Character,
                Stage::Props,
                Stage::RelationshipSubjects,
                Stage::Pair,
                Stage::Narrative,
                Stage::Chapter,
                Stage::Consolidation,
            ]
        );
    }

    #[test]
    fn scheduler_sorts_custom_registries() {
        let scheduler = Scheduler::new(vec![
            extractor(ExtractorKind::Chapter),
            extractor(ExtractorKind::Time),
            extractor(ExtractorKind::Mood),
        ]);
        let kinds: Vec<ExtractorKind> = scheduler.registry().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ExtractorKind::Time, ExtractorKind::Mood, ExtractorKind::Chapter]
        );
    }

    #[test]
    fn fan_out_targets() {
        let current = scene();
        let bounds = ConsolidationConfig::default();

        let chars = expand_targets(&extractor(ExtractorKind::Mood), &current, bounds);
        assert_eq!(chars.len(), 3);

        let pairs = expand_targets(&extractor(ExtractorKind::Feelings), &current, bounds);
        assert_eq!(
            pairs,
            vec![Target::Pair {
                a: "Ada".to_owned(),
                b: "Bo".to_owned(),
            }]
        );

        let global = expand_targets(&extractor(ExtractorKind::Time), &current, bounds);
        assert_eq!(global, vec![Target::Scene]);
    }

    #[test]
    fn consolidation_targets_only_long_lists() {
        let current = scene();
        let bounds = ConsolidationConfig::default();

        let moods = expand_targets(&extractor(ExtractorKind::MoodConsolidation), &current, bounds);
        assert_eq!(
            moods,
            vec![Target::List(ConsolidationTarget::Mood {
                character: "Bo".to_owned(),
            })]
        );

        let feelings =
            expand_targets(&extractor(ExtractorKind::FeelingsConsolidation), &current, bounds);
        assert!(feelings.is_empty());
    }
}
