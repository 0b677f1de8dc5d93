//! Event mapping: validated extractions to stamped events.
//!
//! Mapping never reads the store and has no side effects beyond minting ids
//! and timestamps. One atomic change becomes one event. List changes emit
//! removals before additions so a re-added entry lands last.

use storyline_types::{
    BranchPosition, ChapterEvent, CharacterEvent, ClimateEvent, Event, EventBody, LocationEvent,
    NarrativeEvent, RelationshipEvent, SceneEvent, TimeEvent, contains_folded,
};

use crate::extraction::{
    AttitudeChange, Consolidation, ConsolidationTarget, Extraction, ListChange, TimeChange,
};

/// Phrases that mark an outfit "item" as actually describing a removal.
const REMOVAL_MARKERS: [&str; 5] = [
    "removed",
    "took off",
    "taken off",
    "takes off",
    "no longer wearing",
];

/// Items that mean the slot is empty. Matched against the whole item.
const EMPTY_ITEMS: [&str; 6] = [
    "none",
    "n/a",
    "nothing",
    "empty",
    "not wearing",
    "not wearing anything",
];

/// Map a validated extraction to events stamped at `source`.
pub fn map_extraction(extraction: &Extraction, source: BranchPosition) -> Vec<Event> {
    let bodies = match extraction {
        Extraction::Time { change } => vec![EventBody::Time(match *change {
            TimeChange::Advanced { minutes } => TimeEvent::Advanced { minutes },
            TimeChange::Set { time } => TimeEvent::Set { time },
        })],
        Extraction::Location { location } => vec![EventBody::Location(LocationEvent::Moved {
            area: location.area.trim().to_owned(),
            place: location.place.trim().to_owned(),
            position: location.position.clone(),
            location_type: location.location_type,
        })],
        Extraction::Climate { climate } => vec![EventBody::Climate(ClimateEvent::Changed {
            weather: climate.weather.clone(),
            temperature_c: climate.temperature_c,
        })],
        Extraction::TopicTone { topic, tone } => {
            vec![EventBody::Scene(SceneEvent::TopicToneChanged {
                topic: topic.trim().to_owned(),
                tone: tone.trim().to_owned(),
            })]
        }
        Extraction::Tension { tension } => {
            vec![EventBody::Scene(SceneEvent::TensionChanged { tension: *tension })]
        }
        Extraction::Presence { appeared, departed } => {
            let arrivals = appeared.iter().map(|a| {
                EventBody::Character(CharacterEvent::Appeared {
                    name: a.name.trim().to_owned(),
                    position: a.position.clone(),
                })
            });
            let departures = departed.iter().map(|name| {
                EventBody::Character(CharacterEvent::Departed {
                    name: name.trim().to_owned(),
                })
            });
            departures.chain(arrivals).collect()
        }
        Extraction::Position {
            character,
            position,
        } => vec![EventBody::Character(CharacterEvent::PositionChanged {
            name: character.clone(),
            position: position.trim().to_owned(),
        })],
        Extraction::Activity {
            character,
            activity,
        } => vec![EventBody::Character(CharacterEvent::ActivityChanged {
            name: character.clone(),
            activity: activity.clone(),
        })],
        Extraction::Mood { character, change } => list_events(
            change,
            |value| CharacterEvent::MoodAdded {
                name: character.clone(),
                value,
            },
            |value| CharacterEvent::MoodRemoved {
                name: character.clone(),
                value,
            },
        )
        .into_iter()
        .map(EventBody::Character)
        .collect(),
        Extraction::Physical { character, change } => list_events(
            change,
            |value| CharacterEvent::PhysicalAdded {
                name: character.clone(),
                value,
            },
            |value| CharacterEvent::PhysicalRemoved {
                name: character.clone(),
                value,
            },
        )
        .into_iter()
        .map(EventBody::Character)
        .collect(),
        Extraction::Outfit { character, changes } => changes
            .iter()
            .map(|change| {
                EventBody::Character(CharacterEvent::OutfitChanged {
                    name: character.clone(),
                    slot: change.slot,
                    item: normalize_outfit_item(change.item.as_deref()),
                })
            })
            .collect(),
        Extraction::Profile { character, profile } => {
            vec![EventBody::Character(CharacterEvent::ProfileSet {
                name: character.clone(),
                profile: profile.clone(),
            })]
        }
        Extraction::Props { change } => list_events(
            change,
            |prop| LocationEvent::PropAdded { prop },
            |prop| LocationEvent::PropRemoved { prop },
        )
        .into_iter()
        .map(EventBody::Location)
        .collect(),
        Extraction::Subjects { pairs } => pairs
            .iter()
            .map(|pair| {
                EventBody::Relationship(RelationshipEvent::Established {
                    a: pair.a.trim().to_owned(),
                    b: pair.b.trim().to_owned(),
                    status: pair.status,
                })
            })
            .collect(),
        Extraction::Feelings { changes } => attitude_events(
            changes,
            |from, to, value| RelationshipEvent::FeelingAdded { from, to, value },
            |from, to, value| RelationshipEvent::FeelingRemoved { from, to, value },
        ),
        Extraction::Secrets { changes } => attitude_events(
            changes,
            |from, to, value| RelationshipEvent::SecretAdded { from, to, value },
            |from, to, value| RelationshipEvent::SecretRemoved { from, to, value },
        ),
        Extraction::Wants { changes } => attitude_events(
            changes,
            |from, to, value| RelationshipEvent::WantAdded { from, to, value },
            |from, to, value| RelationshipEvent::WantRemoved { from, to, value },
        ),
        Extraction::Status { a, b, status } => {
            vec![EventBody::Relationship(RelationshipEvent::StatusChanged {
                a: a.clone(),
                b: b.clone(),
                status: *status,
            })]
        }
        Extraction::Narrative { beats } => beats
            .iter()
            .map(|beat| {
                EventBody::Narrative(NarrativeEvent::BeatRecorded {
                    description: beat.description.trim().to_owned(),
                    subjects: beat.subjects.clone(),
                })
            })
            .collect(),
        Extraction::Chapter { chapter } => vec![EventBody::Chapter(ChapterEvent::Ended {
            title: chapter.title.trim().to_owned(),
            summary: chapter.summary.trim().to_owned(),
            start_message: chapter.start_message,
            end_message: source.message_id,
        })],
        Extraction::Consolidated { consolidation } => consolidation_events(consolidation),
    };

    bodies
        .into_iter()
        .map(|body| Event::new(source, body))
        .collect()
}

/// Reclassify outfit items that describe a removal.
///
/// `"boots (took off)"` or `"none"` empty the slot instead of putting that
/// text in it.
pub fn normalize_outfit_item(item: Option<&str>) -> Option<String> {
    let item = item?.trim();
    let lowered = item.to_lowercase();
    let is_removal = item.is_empty()
        || EMPTY_ITEMS.contains(&lowered.as_str())
        || REMOVAL_MARKERS.iter().any(|marker| lowered.contains(marker));
    (!is_removal).then(|| item.to_owned())
}

/// Diff a consolidation into removals and additions.
fn consolidation_events(consolidation: &Consolidation) -> Vec<EventBody> {
    let diff = ListChange {
        added: consolidation
            .consolidated
            .iter()
            .filter(|entry| !contains_folded(&consolidation.previous, entry))
            .cloned()
            .collect(),
        removed: consolidation
            .previous
            .iter()
            .filter(|entry| !contains_folded(&consolidation.consolidated, entry))
            .cloned()
            .collect(),
    };

    match &consolidation.target {
        ConsolidationTarget::Mood { character } => list_events(
            &diff,
            |value| CharacterEvent::MoodAdded {
                name: character.clone(),
                value,
            },
            |value| CharacterEvent::MoodRemoved {
                name: character.clone(),
                value,
            },
        )
        .into_iter()
        .map(EventBody::Character)
        .collect(),
        ConsolidationTarget::Physical { character } => list_events(
            &diff,
            |value| CharacterEvent::PhysicalAdded {
                name: character.clone(),
                value,
            },
            |value| CharacterEvent::PhysicalRemoved {
                name: character.clone(),
                value,
            },
        )
        .into_iter()
        .map(EventBody::Character)
        .collect(),
        ConsolidationTarget::Feelings { from, to } => attitude_events(
            &[AttitudeChange {
                from: from.clone(),
                to: to.clone(),
                change: diff,
            }],
            |from, to, value| RelationshipEvent::FeelingAdded { from, to, value },
            |from, to, value| RelationshipEvent::FeelingRemoved { from, to, value },
        ),
        ConsolidationTarget::Wants { from, to } => attitude_events(
            &[AttitudeChange {
                from: from.clone(),
                to: to.clone(),
                change: diff,
            }],
            |from, to, value| RelationshipEvent::WantAdded { from, to, value },
            |from, to, value| RelationshipEvent::WantRemoved { from, to, value },
        ),
    }
}

fn list_events<T>(
    change: &ListChange,
    added: impl Fn(String) -> T,
    removed: impl Fn(String) -> T,
) -> Vec<T> {
    change
        .removed
        .iter()
        .map(|value| removed(value.trim().to_owned()))
        .chain(change.added.iter().map(|value| added(value.trim().to_owned())))
        .collect()
}

fn attitude_events(
    changes: &[AttitudeChange],
    added: impl Fn(String, String, String) -> RelationshipEvent,
    removed: impl Fn(String, String, String) -> RelationshipEvent,
) -> Vec<EventBody> {
    changes
        .iter()
        .flat_map(|change| {
            list_events(
                &change.change,
                |value| added(change.from.clone(), change.to.clone(), value),
                |value| removed(change.from.clone(), change.to.clone(), value),
            )
        })
        .map(EventBody::Relationship)
        .collect()
}
