//! Validation and dedup of extractor output.
//!
//! Generator output re-asserts facts, removes things that were never there,
//! and invents arrivals. Each [`Extraction`] is filtered before mapping:
//!
//! 1. List additions already present (case-insensitive) are dropped.
//! 2. List removals of absent entries are dropped.
//! 3. Arrivals of present characters and departures of absent ones are dropped.
//! 4. Scalar changes equal to the current value are dropped.
//! 5. Per-character and per-pair output for unknown subjects is dropped.
//!
//! List dedup compares against the **prior** projection: what was committed
//! before this pass started. The turn projection is consulted only where the
//! pass itself changes what makes sense (worn clothing for props, the list a
//! consolidation rewrites, scalars already set this turn).
//!
//! Filtering is idempotent, and an extraction with nothing left is `None`.

use storyline_types::{
    BranchPosition, PairKey, Relationship, contains_folded, fold_key,
};

use crate::config::ConsolidationConfig;
use crate::consolidation::{enforce_bounds, needs_consolidation, same_entries};
use crate::extraction::{
    Arrival, AttitudeChange, BeatProposal, ChapterClose, Consolidation, ConsolidationTarget,
    Extraction, ListChange, NewRelationship, OutfitChange, TimeChange,
};
use crate::mapping::normalize_outfit_item;
use crate::projection::Projection;

/// Knobs that shape validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// Minimum messages a chapter must span.
    pub min_chapter_messages: u32,
    /// Consolidation bounds.
    pub consolidation: ConsolidationConfig,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_chapter_messages: 4,
            consolidation: ConsolidationConfig::default(),
        }
    }
}

/// Everything validation looks at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Committed state before this pass.
    pub prior: &'a Projection,
    /// Prior state plus turn events produced so far.
    pub current: &'a Projection,
    /// Message being extracted.
    pub position: BranchPosition,
    /// Validation knobs.
    pub rules: ValidationRules,
}

/// Filter an extraction. `None` means nothing survived.
pub fn validate(extraction: Extraction, ctx: &ValidationContext<'_>) -> Option<Extraction> {
    match extraction {
        Extraction::Time { change } => validate_time(change, ctx),
        Extraction::Location { location } => {
            let place = location.place.trim();
            let current = ctx.current.location();
            let unchanged = same_text(current.area.as_deref(), Some(&location.area))
                && same_text(current.place.as_deref(), Some(place))
                && same_text(current.position.as_deref(), location.position.as_deref())
                && (location.location_type.is_none()
                    || current.location_type == location.location_type);
            (!place.is_empty() && !unchanged).then_some(Extraction::Location { location })
        }
        Extraction::Climate { climate } => {
            let current = ctx.current.climate();
            let weather_changed = climate.weather.is_some()
                && !same_text(current.weather.as_deref(), climate.weather.as_deref());
            let temperature_changed =
                climate.temperature_c.is_some() && current.temperature_c != climate.temperature_c;
            (weather_changed || temperature_changed).then_some(Extraction::Climate { climate })
        }
        Extraction::TopicTone { topic, tone } => {
            let scene = ctx.current.scene();
            let blank = topic.trim().is_empty() || tone.trim().is_empty();
            let unchanged = same_text(scene.topic.as_deref(), Some(&topic))
                && same_text(scene.tone.as_deref(), Some(&tone));
            (!blank && !unchanged).then_some(Extraction::TopicTone { topic, tone })
        }
        Extraction::Tension { tension } => (ctx.current.scene().tension != tension)
            .then_some(Extraction::Tension { tension }),
        Extraction::Presence { appeared, departed } => validate_presence(appeared, departed, ctx),
        Extraction::Position {
            character,
            position,
        } => {
            let current = ctx.current.character(&character)?;
            let changed = !position.trim().is_empty()
                && !same_text(current.position.as_deref(), Some(&position));
            changed.then_some(Extraction::Position {
                character,
                position,
            })
        }
        Extraction::Activity {
            character,
            activity,
        } => {
            let current = ctx.current.character(&character)?;
            let activity = activity.filter(|a| !a.trim().is_empty());
            (!same_text(current.activity.as_deref(), activity.as_deref())).then_some(
                Extraction::Activity {
                    character,
                    activity,
                },
            )
        }
        Extraction::Mood { character, change } => {
            ctx.current.character(&character)?;
            let baseline = ctx
                .prior
                .character(&character)
                .map(|c| c.mood.as_slice())
                .unwrap_or_default();
            let change = filter_list(change, baseline);
            (!change.is_empty()).then_some(Extraction::Mood { character, change })
        }
        Extraction::Physical { character, change } => {
            ctx.current.character(&character)?;
            let baseline = ctx
                .prior
                .character(&character)
                .map(|c| c.physical.as_slice())
                .unwrap_or_default();
            let change = filter_list(change, baseline);
            (!change.is_empty()).then_some(Extraction::Physical { character, change })
        }
        Extraction::Outfit { character, changes } => {
            let current = ctx.current.character(&character)?;
            let mut kept: Vec<OutfitChange> = Vec::new();
            // Last proposal per slot wins.
            for change in changes.into_iter().rev() {
                if kept.iter().any(|k| k.slot == change.slot) {
                    continue;
                }
                let item = normalize_outfit_item(change.item.as_deref());
                let worn = current.outfit.get(change.slot).map(String::as_str);
                if !same_text(worn, item.as_deref()) {
                    kept.push(OutfitChange {
                        slot: change.slot,
                        item,
                    });
                }
            }
            kept.reverse();
            (!kept.is_empty()).then_some(Extraction::Outfit {
                character,
                changes: kept,
            })
        }
        Extraction::Profile { character, profile } => {
            let current = ctx.current.character(&character)?;
            current
                .profile
                .is_none()
                .then_some(Extraction::Profile { character, profile })
        }
        Extraction::Props { change } => validate_props(change, ctx),
        Extraction::Subjects { pairs } => validate_subjects(pairs, ctx),
        Extraction::Feelings { changes } => {
            let changes = filter_attitudes(changes, ctx, |a| &a.feelings);
            (!changes.is_empty()).then_some(Extraction::Feelings { changes })
        }
        Extraction::Secrets { changes } => {
            let changes = filter_attitudes(changes, ctx, |a| &a.secrets);
            (!changes.is_empty()).then_some(Extraction::Secrets { changes })
        }
        Extraction::Wants { changes } => {
            let changes = filter_attitudes(changes, ctx, |a| &a.wants);
            (!changes.is_empty()).then_some(Extraction::Wants { changes })
        }
        Extraction::Status { a, b, status } => {
            let rel = ctx.current.relationship(&a, &b)?;
            (rel.status != status).then_some(Extraction::Status { a, b, status })
        }
        Extraction::Narrative { beats } => validate_beats(beats, ctx),
        Extraction::Chapter { chapter } => validate_chapter(chapter, ctx),
        Extraction::Consolidated { consolidation } => validate_consolidation(consolidation, ctx),
    }
}

fn validate_time(change: TimeChange, ctx: &ValidationContext<'_>) -> Option<Extraction> {
    let keep = match change {
        TimeChange::Advanced { minutes } => minutes > 0,
        TimeChange::Set { time } => ctx.current.time() != Some(time),
    };
    keep.then_some(Extraction::Time { change })
}

fn validate_presence(
    appeared: Vec<Arrival>,
    departed: Vec<String>,
    ctx: &ValidationContext<'_>,
) -> Option<Extraction> {
    let mut arrivals: Vec<Arrival> = Vec::new();
    for arrival in appeared {
        let name = arrival.name.trim();
        if name.is_empty()
            || ctx.prior.is_present(name)
            || arrivals.iter().any(|a| fold_key(&a.name) == fold_key(name))
        {
            continue;
        }
        arrivals.push(arrival);
    }

    let mut departures: Vec<String> = Vec::new();
    for name in departed {
        let contradicted = arrivals.iter().any(|a| fold_key(&a.name) == fold_key(&name));
        if ctx.prior.is_present(&name) && !contradicted && !contains_folded(&departures, &name) {
            departures.push(name);
        }
    }

    (!arrivals.is_empty() || !departures.is_empty()).then_some(Extraction::Presence {
        appeared: arrivals,
        departed: departures,
    })
}

fn validate_props(change: ListChange, ctx: &ValidationContext<'_>) -> Option<Extraction> {
    // A move this turn cleared the props, so the old place's list is stale.
    let moved = !same_text(
        ctx.prior.location().place.as_deref(),
        ctx.current.location().place.as_deref(),
    );
    let baseline = if moved {
        &ctx.current.location().props
    } else {
        &ctx.prior.location().props
    };
    let worn: Vec<String> = ctx.current.worn_items().cloned().collect();

    let mut change = filter_list(change, baseline);
    change.added.retain(|prop| !contains_folded(&worn, prop));
    (!change.is_empty()).then_some(Extraction::Props { change })
}

fn validate_subjects(pairs: Vec<NewRelationship>, ctx: &ValidationContext<'_>) -> Option<Extraction> {
    let mut kept: Vec<NewRelationship> = Vec::new();
    for pair in pairs {
        let key = PairKey::new(&pair.a, &pair.b);
        let valid = fold_key(&pair.a) != fold_key(&pair.b)
            && ctx.current.is_present(&pair.a)
            && ctx.current.is_present(&pair.b)
            && ctx.current.relationship(&pair.a, &pair.b).is_none()
            && !kept.iter().any(|k| PairKey::new(&k.a, &k.b) == key);
        if valid {
            kept.push(pair);
        }
    }
    (!kept.is_empty()).then_some(Extraction::Subjects { pairs: kept })
}

fn filter_attitudes(
    changes: Vec<AttitudeChange>,
    ctx: &ValidationContext<'_>,
    list: impl Fn(&storyline_types::Attitude) -> &Vec<String>,
) -> Vec<AttitudeChange> {
    let mut kept: Vec<AttitudeChange> = Vec::new();
    for change in changes {
        let Some(current) = ctx.current.relationship(&change.from, &change.to) else {
            continue;
        };
        if fold_key(&change.from) == fold_key(&change.to) || current.attitude(&change.from).is_none()
        {
            continue;
        }
        let baseline = ctx
            .prior
            .relationship(&change.from, &change.to)
            .and_then(|rel: &Relationship| rel.attitude(&change.from))
            .map(|attitude| list(attitude).as_slice())
            .unwrap_or_default();
        let filtered = filter_list(change.change, baseline);
        if filtered.is_empty() {
            continue;
        }
        if let Some(existing) = kept
            .iter_mut()
            .find(|k| fold_key(&k.from) == fold_key(&change.from) && fold_key(&k.to) == fold_key(&change.to))
        {
            existing.change = filter_list(
                ListChange {
                    added: [existing.change.added.clone(), filtered.added].concat(),
                    removed: [existing.change.removed.clone(), filtered.removed].concat(),
                },
                baseline,
            );
        } else {
            kept.push(AttitudeChange {
                from: change.from,
                to: change.to,
                change: filtered,
            });
        }
    }
    kept
}

fn validate_beats(beats: Vec<BeatProposal>, ctx: &ValidationContext<'_>) -> Option<Extraction> {
    let recorded: Vec<String> = ctx
        .prior
        .beats()
        .iter()
        .map(|b| b.description.clone())
        .collect();
    let mut kept: Vec<BeatProposal> = Vec::new();
    for beat in beats {
        let description = beat.description.trim();
        if description.is_empty()
            || contains_folded(&recorded, description)
            || kept.iter().any(|k| fold_key(&k.description) == fold_key(description))
        {
            continue;
        }
        kept.push(beat);
    }
    (!kept.is_empty()).then_some(Extraction::Narrative { beats: kept })
}

fn validate_chapter(chapter: ChapterClose, ctx: &ValidationContext<'_>) -> Option<Extraction> {
    let end = ctx.position.message_id;
    let start = match ctx.prior.last_chapter_end() {
        Some(last) if last >= end => return None,
        Some(last) => last.checked_add(1)?,
        None => 0,
    };
    let span = end.checked_sub(start)?.saturating_add(1);
    if span < ctx.rules.min_chapter_messages || chapter.title.trim().is_empty() {
        return None;
    }
    Some(Extraction::Chapter {
        chapter: ChapterClose {
            start_message: start,
            ..chapter
        },
    })
}

fn validate_consolidation(
    consolidation: Consolidation,
    ctx: &ValidationContext<'_>,
) -> Option<Extraction> {
    let current = target_list(ctx.current, &consolidation.target)?;
    if !needs_consolidation(current, ctx.rules.consolidation) {
        return None;
    }
    // Entries removed earlier this pass stay removed.
    let committed = target_list(ctx.prior, &consolidation.target).unwrap_or_default();
    let proposed: Vec<String> = consolidation
        .consolidated
        .into_iter()
        .filter(|entry| contains_folded(current, entry) || !contains_folded(committed, entry))
        .collect();
    let consolidated = enforce_bounds(&proposed, current, ctx.rules.consolidation);
    if same_entries(&consolidated, current) {
        return None;
    }
    Some(Extraction::Consolidated {
        consolidation: Consolidation {
            target: consolidation.target,
            previous: current.to_vec(),
            consolidated,
        },
    })
}

/// The list a consolidation target addresses in `projection`.
pub fn target_list<'p>(projection: &'p Projection, target: &ConsolidationTarget) -> Option<&'p [String]> {
    match target {
        ConsolidationTarget::Mood { character } => {
            projection.character(character).map(|c| c.mood.as_slice())
        }
        ConsolidationTarget::Physical { character } => {
            projection.character(character).map(|c| c.physical.as_slice())
        }
        ConsolidationTarget::Feelings { from, to } => projection
            .relationship(from, to)
            .and_then(|rel| rel.attitude(from))
            .map(|a| a.feelings.as_slice()),
        ConsolidationTarget::Wants { from, to } => projection
            .relationship(from, to)
            .and_then(|rel| rel.attitude(from))
            .map(|a| a.wants.as_slice()),
    }
}

/// Keep genuine transitions only, deduplicating within the proposal.
fn filter_list(change: ListChange, baseline: &[String]) -> ListChange {
    let mut added: Vec<String> = Vec::new();
    for value in change.added {
        let value = value.trim();
        if !value.is_empty() && !contains_folded(baseline, value) && !contains_folded(&added, value)
        {
            added.push(value.to_owned());
        }
    }
    let mut removed: Vec<String> = Vec::new();
    for value in change.removed {
        let value = value.trim();
        if contains_folded(baseline, value) && !contains_folded(&removed, value) {
            removed.push(value.to_owned());
        }
    }
    ListChange { added, removed }
}

/// Case-insensitive equality of optional text.
fn same_text(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => fold_key(a) == fold_key(b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use storyline_types::{
        CharacterEvent, Event, EventBody, LocationEvent, OutfitSlot, RelationshipEvent,
        RelationshipStatus, Snapshot,
    };

    use super::*;

    const AT: BranchPosition = BranchPosition::new(5, 0);

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    fn character(change: CharacterEvent) -> Event {
        Event::new(AT, EventBody::Character(change))
    }

    fn appeared(name: &str) -> Event {
        character(CharacterEvent::Appeared {
            name: name.to_owned(),
            position: None,
        })
    }

    fn mood(name: &str, value: &str) -> Event {
        character(CharacterEvent::MoodAdded {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }

    fn projection(events: &[Event]) -> Projection {
        Projection::fold(Snapshot::empty(AT), events)
    }

    fn ctx<'a>(prior: &'a Projection, current: &'a Projection) -> ValidationContext<'a> {
        ValidationContext {
            prior,
            current,
            position: AT,
            rules: ValidationRules::default(),
        }
    }

    fn check_idempotent(extraction: Extraction, ctx: &ValidationContext<'_>) -> Option<Extraction> {
        let once = validate(extraction, ctx);
        let twice = once.clone().and_then(|e| validate(e, ctx));
        assert_eq!(once, twice);
        once
    }

    #[test]
    fn appeared_for_present_character_is_dropped() {
        let prior = projection(&[appeared("Ada")]);
        let result = check_idempotent(
            Extraction::Presence {
                appeared: vec![Arrival {
                    name: "ADA".to_owned(),
                    position: None,
                }],
                departed: vec![],
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn presence_keeps_real_transitions_only() {
        let prior = projection(&[appeared("Ada"), appeared("Bo")]);
        let result = check_idempotent(
            Extraction::Presence {
                appeared: vec![
                    Arrival {
                        name: "Cy".to_owned(),
                        position: Some("doorway".to_owned()),
                    },
                    Arrival {
                        name: "cy".to_owned(),
                        position: None,
                    },
                ],
                departed: strings(&["Bo", "Dee", "bo"]),
            },
            &ctx(&prior, &prior),
        );
        assert!(matches!(result, Some(Extraction::Presence { .. })));
        let Some(Extraction::Presence { appeared, departed }) = result else {
            return;
        };
        assert_eq!(appeared.len(), 1);
        assert_eq!(departed, strings(&["Bo"]));
    }

    #[test]
    fn mood_dedup_uses_prior_projection() {
        let prior = projection(&[appeared("Ada"), mood("Ada", "calm")]);
        let current = prior.with_turn_events(&[mood("Ada", "curious")]);
        let result = check_idempotent(
            Extraction::Mood {
                character: "Ada".to_owned(),
                change: ListChange {
                    added: strings(&["Calm", "curious", "wary", "WARY"]),
                    removed: strings(&["sad", "calm"]),
                },
            },
            &ctx(&prior, &current),
        );
        assert_eq!(
            result,
            Some(Extraction::Mood {
                character: "Ada".to_owned(),
                change: ListChange {
                    added: strings(&["curious", "wary"]),
                    removed: strings(&["calm"]),
                },
            })
        );
    }

    #[test]
    fn fully_redundant_output_is_a_no_op() {
        let prior = projection(&[appeared("Ada"), mood("Ada", "calm")]);
        let result = validate(
            Extraction::Mood {
                character: "Ada".to_owned(),
                change: ListChange {
                    added: strings(&["CALM"]),
                    removed: strings(&["angry"]),
                },
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn per_character_output_for_absent_character_is_dropped() {
        let prior = projection(&[appeared("Ada")]);
        let result = validate(
            Extraction::Position {
                character: "Ghost".to_owned(),
                position: "attic".to_owned(),
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn props_skip_worn_clothing() {
        let prior = projection(&[appeared("Ada")]);
        let current = prior.with_turn_events(&[character(CharacterEvent::OutfitChanged {
            name: "Ada".to_owned(),
            slot: OutfitSlot::Head,
            item: Some("Straw Hat".to_owned()),
        })]);
        let result = check_idempotent(
            Extraction::Props {
                change: ListChange {
                    added: strings(&["straw hat", "lantern"]),
                    removed: vec![],
                },
            },
            &ctx(&prior, &current),
        );
        assert_eq!(
            result,
            Some(Extraction::Props {
                change: ListChange {
                    added: strings(&["lantern"]),
                    removed: vec![],
                },
            })
        );
    }

    #[test]
    fn props_after_move_compare_against_new_place() {
        let moved = |place: &str| {
            Event::new(
                AT,
                EventBody::Location(LocationEvent::Moved {
                    area: "Town".to_owned(),
                    place: place.to_owned(),
                    position: None,
                    location_type: None,
                }),
            )
        };
        let table = Event::new(
            AT,
            EventBody::Location(LocationEvent::PropAdded {
                prop: "table".to_owned(),
            }),
        );
        let prior = projection(&[moved("Inn"), table]);
        let current = prior.with_turn_events(&[moved("Mill")]);
        let result = validate(
            Extraction::Props {
                change: ListChange {
                    added: strings(&["table"]),
                    removed: strings(&["table"]),
                },
            },
            &ctx(&prior, &current),
        );
        assert_eq!(
            result,
            Some(Extraction::Props {
                change: ListChange {
                    added: strings(&["table"]),
                    removed: vec![],
                },
            })
        );
    }

    #[test]
    fn subjects_require_two_present_unrelated_characters() {
        let prior = projection(&[
            appeared("Ada"),
            appeared("Bo"),
            appeared("Cy"),
            Event::new(
                AT,
                EventBody::Relationship(RelationshipEvent::Established {
                    a: "Ada".to_owned(),
                    b: "Bo".to_owned(),
                    status: RelationshipStatus::Friendly,
                }),
            ),
        ]);
        let pair = |a: &str, b: &str| NewRelationship {
            a: a.to_owned(),
            b: b.to_owned(),
            status: RelationshipStatus::Strangers,
        };
        let result = check_idempotent(
            Extraction::Subjects {
                pairs: vec![
                    pair("bo", "ada"),
                    pair("Ada", "Ada"),
                    pair("Ada", "Ghost"),
                    pair("Cy", "Ada"),
                    pair("ada", "cy"),
                ],
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(
            result,
            Some(Extraction::Subjects {
                pairs: vec![pair("Cy", "Ada")],
            })
        );
    }

    #[test]
    fn feelings_need_an_established_pair() {
        let prior = projection(&[appeared("Ada"), appeared("Bo")]);
        let change = AttitudeChange {
            from: "Ada".to_owned(),
            to: "Bo".to_owned(),
            change: ListChange {
                added: strings(&["trust"]),
                removed: vec![],
            },
        };
        assert_eq!(
            validate(
                Extraction::Feelings {
                    changes: vec![change.clone()],
                },
                &ctx(&prior, &prior),
            ),
            None
        );

        let current = prior.with_turn_events(&[Event::new(
            AT,
            EventBody::Relationship(RelationshipEvent::Established {
                a: "Ada".to_owned(),
                b: "Bo".to_owned(),
                status: RelationshipStatus::Strangers,
            }),
        )]);
        let result = check_idempotent(
            Extraction::Feelings {
                changes: vec![change.clone()],
            },
            &ctx(&prior, &current),
        );
        assert_eq!(
            result,
            Some(Extraction::Feelings {
                changes: vec![change],
            })
        );
    }

    #[test]
    fn chapter_needs_minimum_span() {
        let prior = projection(&[]);
        let close = ChapterClose {
            title: "Opening".to_owned(),
            summary: "It begins.".to_owned(),
            start_message: 0,
        };
        let too_soon = ValidationContext {
            position: BranchPosition::new(2, 0),
            ..ctx(&prior, &prior)
        };
        assert_eq!(
            validate(
                Extraction::Chapter {
                    chapter: close.clone(),
                },
                &too_soon,
            ),
            None
        );

        let result = check_idempotent(Extraction::Chapter { chapter: close }, &ctx(&prior, &prior));
        assert!(matches!(
            result,
            Some(Extraction::Chapter {
                chapter: ChapterClose {
                    start_message: 0,
                    ..
                }
            })
        ));
    }

    #[test]
    fn consolidation_is_bounded_and_rebased_on_turn_state() {
        let moods = ["happy", "joyful", "cheerful", "glad", "elated", "content", "upbeat"];
        let mut events = vec![appeared("Ada")];
        events.extend(moods.iter().map(|m| mood("Ada", m)));
        let prior = projection(&events);

        let result = check_idempotent(
            Extraction::Consolidated {
                consolidation: Consolidation {
                    target: ConsolidationTarget::Mood {
                        character: "Ada".to_owned(),
                    },
                    previous: vec![],
                    consolidated: strings(&["Happy", "happy", "content"]),
                },
            },
            &ctx(&prior, &prior),
        );
        assert!(matches!(result, Some(Extraction::Consolidated { .. })));
        let Some(Extraction::Consolidated { consolidation }) = result else {
            return;
        };
        assert_eq!(consolidation.previous.len(), 7);
        assert_eq!(consolidation.consolidated, strings(&["Happy", "content"]));
    }

    #[test]
    fn consolidation_does_not_restore_entries_removed_this_turn() {
        let prior = projection(&[
            appeared("Ada"),
            mood("Ada", "happy"),
            mood("Ada", "glad"),
            mood("Ada", "joyful"),
            mood("Ada", "sad"),
        ]);
        let current = prior.with_turn_events(&[character(CharacterEvent::MoodRemoved {
            name: "Ada".to_owned(),
            value: "sad".to_owned(),
        })]);

        let result = check_idempotent(
            Extraction::Consolidated {
                consolidation: Consolidation {
                    target: ConsolidationTarget::Mood {
                        character: "Ada".to_owned(),
                    },
                    previous: vec![],
                    consolidated: strings(&["happy", "Sad"]),
                },
            },
            &ctx(&prior, &current),
        );
        assert!(matches!(result, Some(Extraction::Consolidated { .. })));
        let Some(Extraction::Consolidated { consolidation }) = result else {
            return;
        };
        assert_eq!(consolidation.previous, strings(&["happy", "glad", "joyful"]));
        assert_eq!(consolidation.consolidated, strings(&["happy", "glad"]));
        assert!(!contains_folded(&consolidation.consolidated, "sad"));
    }

    #[test]
    fn outfit_removal_of_an_empty_slot_is_dropped() {
        let prior = projection(&[
            appeared("Ada"),
            character(CharacterEvent::OutfitChanged {
                name: "Ada".to_owned(),
                slot: OutfitSlot::Footwear,
                item: Some("boots".to_owned()),
            }),
        ]);
        let removal = |slot, item: &str| OutfitChange {
            slot,
            item: Some(item.to_owned()),
        };

        let empty_slots = validate(
            Extraction::Outfit {
                character: "Ada".to_owned(),
                changes: vec![
                    removal(OutfitSlot::Head, "took off her hat"),
                    removal(OutfitSlot::Neck, "none"),
                ],
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(empty_slots, None);

        let result = check_idempotent(
            Extraction::Outfit {
                character: "Ada".to_owned(),
                changes: vec![
                    removal(OutfitSlot::Head, "took off her hat"),
                    removal(OutfitSlot::Footwear, "kicked off, nothing"),
                    removal(OutfitSlot::Footwear, "Removed her boots"),
                ],
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(
            result,
            Some(Extraction::Outfit {
                character: "Ada".to_owned(),
                changes: vec![OutfitChange {
                    slot: OutfitSlot::Footwear,
                    item: None,
                }],
            })
        );
    }

    #[test]
    fn consolidation_skips_short_lists() {
        let prior = projection(&[appeared("Ada"), mood("Ada", "calm"), mood("Ada", "alert")]);
        let result = validate(
            Extraction::Consolidated {
                consolidation: Consolidation {
                    target: ConsolidationTarget::Mood {
                        character: "Ada".to_owned(),
                    },
                    previous: vec![],
                    consolidated: strings(&["calm"]),
                },
            },
            &ctx(&prior, &prior),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn scalar_equal_to_current_is_dropped() {
        let prior = projection(&[appeared("Ada")]);
        let current = prior.with_turn_events(&[character(CharacterEvent::PositionChanged {
            name: "Ada".to_owned(),
            position: "by the fire".to_owned(),
        })]);
        let result = validate(
            Extraction::Position {
                character: "ada".to_owned(),
                position: "By the fire".to_owned(),
            },
            &ctx(&prior, &current),
        );
        assert_eq!(result, None);
        let stalled = Extraction::Time {
            change: TimeChange::Advanced { minutes: 0 },
        };
        assert_eq!(validate(stalled, &ctx(&prior, &prior)), None);
    }
}
