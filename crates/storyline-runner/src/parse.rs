//! Generator response parsing into typed extractions.
//!
//! The generator returns raw text (ideally JSON). This module recovers the
//! JSON object and shapes it into an [`Extraction`] for the extractor that
//! asked. Responses are read leniently: missing fields default, unknown
//! outfit slots are skipped, and a bare name is accepted where an arrival
//! object is expected. Anything that still does not fit is a
//! [`RunnerError::Parse`], which the pass logs and treats as "no output".

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use storyline_core::extraction::{
    Arrival, AttitudeChange, BeatProposal, ChapterClose, ClimateChange, Consolidation, Extraction,
    ListChange, LocationChange, NewRelationship, OutfitChange, TimeChange,
};
use storyline_types::{
    CharacterProfile, LocationType, OutfitSlot, RelationshipStatus, Tension, TensionDirection,
    TensionLevel, TensionType,
};

use crate::error::RunnerError;
use crate::extractor::{ExtractorKind, Target};

/// Accepted in-story time formats.
const TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Recover a JSON value from raw generator text.
///
/// Tries, in order:
/// 1. Direct `serde_json` parse
/// 2. The body of a markdown code block
/// 3. The text with trailing commas stripped
/// 4. A code block body with trailing commas stripped
/// 5. The span from the first `{` to the last `}`
pub fn parse_json(raw: &str) -> Result<serde_json::Value, RunnerError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let block = extract_json_from_codeblock(trimmed);
    if let Some(json_str) = block
        && let Ok(value) = serde_json::from_str(json_str)
    {
        return Ok(value);
    }

    if let Ok(value) = serde_json::from_str(&strip_trailing_commas(trimmed)) {
        return Ok(value);
    }

    if let Some(json_str) = block
        && let Ok(value) = serde_json::from_str(&strip_trailing_commas(json_str))
    {
        return Ok(value);
    }

    if let Some(json_str) = outer_object(trimmed)
        && let Ok(value) = serde_json::from_str(&strip_trailing_commas(json_str))
    {
        return Ok(value);
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Parse the response of `kind` run against `target`.
///
/// `Ok(None)` means the generator explicitly reported nothing (no time
/// information, no chapter boundary).
pub fn parse_extraction(
    kind: ExtractorKind,
    target: &Target,
    raw: &str,
) -> Result<Option<Extraction>, RunnerError> {
    use ExtractorKind as K;

    let value = parse_json(raw)?;
    let extraction = match kind {
        K::Time => {
            let raw: RawTime = shape(kind, value)?;
            raw.into_change().map(|change| Extraction::Time { change })
        }
        K::Location => {
            let raw: RawLocation = shape(kind, value)?;
            raw.into_change().map(|location| Extraction::Location { location })
        }
        K::Climate => Some(Extraction::Climate {
            climate: shape::<ClimateChange>(kind, value)?,
        }),
        K::TopicTone => {
            let raw: RawTopicTone = shape(kind, value)?;
            Some(Extraction::TopicTone {
                topic: raw.topic,
                tone: raw.tone,
            })
        }
        K::Tension => Some(Extraction::Tension {
            tension: shape::<RawTension>(kind, value)?.into(),
        }),
        K::Presence => {
            let raw: RawPresence = shape(kind, value)?;
            Some(Extraction::Presence {
                appeared: raw.appeared.into_iter().map(Arrival::from).collect(),
                departed: raw.departed,
            })
        }
        K::Position => {
            let character = character(kind, target)?.to_owned();
            let raw: RawPosition = shape(kind, value)?;
            raw.position.map(|position| Extraction::Position {
                character,
                position,
            })
        }
        K::Activity => Some(Extraction::Activity {
            character: character(kind, target)?.to_owned(),
            activity: shape::<RawActivity>(kind, value)?.activity,
        }),
        K::Mood => Some(Extraction::Mood {
            character: character(kind, target)?.to_owned(),
            change: shape(kind, value)?,
        }),
        K::Physical => Some(Extraction::Physical {
            character: character(kind, target)?.to_owned(),
            change: shape(kind, value)?,
        }),
        K::Outfit => Some(Extraction::Outfit {
            character: character(kind, target)?.to_owned(),
            changes: shape::<RawOutfit>(kind, value)?.into_changes(),
        }),
        K::Profile => Some(Extraction::Profile {
            character: character(kind, target)?.to_owned(),
            profile: shape::<RawProfile>(kind, value)?.into(),
        }),
        K::Props => Some(Extraction::Props {
            change: shape(kind, value)?,
        }),
        K::RelationshipSubjects => Some(Extraction::Subjects {
            pairs: shape::<RawSubjects>(kind, value)?.pairs,
        }),
        K::Feelings => Some(Extraction::Feelings {
            changes: attitude_changes(kind, target, value)?,
        }),
        K::Secrets => Some(Extraction::Secrets {
            changes: attitude_changes(kind, target, value)?,
        }),
        K::Wants => Some(Extraction::Wants {
            changes: attitude_changes(kind, target, value)?,
        }),
        K::Status => {
            let (a, b) = pair(kind, target)?;
            Some(Extraction::Status {
                a: a.to_owned(),
                b: b.to_owned(),
                status: shape::<RawStatus>(kind, value)?.status,
            })
        }
        K::Narrative => Some(Extraction::Narrative {
            beats: shape::<RawNarrative>(kind, value)?.beats,
        }),
        K::Chapter => {
            let raw: RawChapter = shape(kind, value)?;
            raw.ended.then(|| Extraction::Chapter {
                chapter: ChapterClose {
                    title: raw.title,
                    summary: raw.summary,
                    start_message: 0,
                },
            })
        }
        K::MoodConsolidation
        | K::PhysicalConsolidation
        | K::FeelingsConsolidation
        | K::WantsConsolidation => {
            let Target::List(list) = target else {
                return Err(wrong_target(kind, target));
            };
            Some(Extraction::Consolidated {
                consolidation: Consolidation {
                    target: list.clone(),
                    previous: Vec::new(),
                    consolidated: shape::<RawConsolidation>(kind, value)?.consolidated,
                },
            })
        }
    };
    Ok(extraction)
}

/// Parse the opening-scene response into extractions, in the order they
/// must be applied: scene facts, arrivals, per-character state, then pairs.
pub fn parse_initial_state(raw: &str) -> Result<Vec<Extraction>, RunnerError> {
    let value = parse_json(raw)?;
    let initial: RawInitial = serde_json::from_value(value)
        .map_err(|e| RunnerError::Parse(format!("initial state: {e}")))?;

    let mut out = Vec::new();
    if let Some(change) = initial.time.and_then(|t| parse_time(&t)) {
        out.push(Extraction::Time {
            change: TimeChange::Set { time: change },
        });
    }
    if let Some(location) = initial.location.and_then(RawLocation::into_change) {
        out.push(Extraction::Location { location });
    }
    if let Some(climate) = initial.climate {
        out.push(Extraction::Climate { climate });
    }
    if let (Some(topic), Some(tone)) = (initial.topic, initial.tone) {
        out.push(Extraction::TopicTone { topic, tone });
    }
    // An unreadable tension is dropped without losing the rest of the seed.
    if let Some(tension) = initial
        .tension
        .and_then(|v| serde_json::from_value::<RawTension>(v).ok())
    {
        out.push(Extraction::Tension {
            tension: tension.into(),
        });
    }

    out.push(Extraction::Presence {
        appeared: initial
            .characters
            .iter()
            .map(|c| Arrival {
                name: c.name.clone(),
                position: c.position.clone(),
            })
            .collect(),
        departed: Vec::new(),
    });

    for c in initial.characters {
        if c.activity.is_some() {
            out.push(Extraction::Activity {
                character: c.name.clone(),
                activity: c.activity,
            });
        }
        out.push(Extraction::Mood {
            character: c.name.clone(),
            change: ListChange {
                added: c.mood,
                removed: Vec::new(),
            },
        });
        out.push(Extraction::Physical {
            character: c.name.clone(),
            change: ListChange {
                added: c.physical,
                removed: Vec::new(),
            },
        });
        out.push(Extraction::Outfit {
            character: c.name.clone(),
            changes: slot_changes(c.outfit),
        });
        if let Some(profile) = c.profile {
            out.push(Extraction::Profile {
                character: c.name,
                profile: profile.into(),
            });
        }
    }

    if !initial.relationships.is_empty() {
        out.push(Extraction::Subjects {
            pairs: initial.relationships,
        });
    }
    Ok(out)
}

fn shape<T: DeserializeOwned>(
    kind: ExtractorKind,
    value: serde_json::Value,
) -> Result<T, RunnerError> {
    serde_json::from_value(value).map_err(|e| RunnerError::Parse(format!("{kind}: {e}")))
}

fn wrong_target(kind: ExtractorKind, target: &Target) -> RunnerError {
    RunnerError::Parse(format!("{kind} cannot run against {target}"))
}

fn character(kind: ExtractorKind, target: &Target) -> Result<&str, RunnerError> {
    match target {
        Target::Character(name) => Ok(name),
        _ => Err(wrong_target(kind, target)),
    }
}

fn pair(kind: ExtractorKind, target: &Target) -> Result<(&str, &str), RunnerError> {
    match target {
        Target::Pair { a, b } => Ok((a, b)),
        _ => Err(wrong_target(kind, target)),
    }
}

fn attitude_changes(
    kind: ExtractorKind,
    target: &Target,
    value: serde_json::Value,
) -> Result<Vec<AttitudeChange>, RunnerError> {
    let (a, b) = pair(kind, target)?;
    let raw: RawAttitudes = shape(kind, value)?;
    Ok([(a, b, raw.a_to_b), (b, a, raw.b_to_a)]
        .into_iter()
        .filter(|(_, _, change)| !change.is_empty())
        .map(|(from, to, change)| AttitudeChange {
            from: from.to_owned(),
            to: to.to_owned(),
            change,
        })
        .collect())
}

fn parse_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

fn slot_changes(slots: BTreeMap<String, Option<String>>) -> Vec<OutfitChange> {
    slots
        .into_iter()
        .filter_map(|(slot, item)| OutfitSlot::parse(&slot).map(|slot| OutfitChange { slot, item }))
        .collect()
}

/// Slice from the first `{` to the last `}`.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    text.get(start..=end)
}

/// Extract JSON content from markdown code blocks.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let after_fence = |tag_len: usize, i: usize| {
        let after_tag = i.checked_add(tag_len).unwrap_or(i);
        text.get(after_tag..)
            .and_then(|s| s.find('\n'))
            .and_then(|nl| after_tag.checked_add(nl))
            .and_then(|pos| pos.checked_add(1))
            .unwrap_or(after_tag)
    };
    let start = text
        .find("```json")
        .map(|i| after_fence(7, i))
        .or_else(|| text.find("```").map(|i| after_fence(3, i)))?;

    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let rest: String = chars.clone().skip_while(|n| n.is_whitespace()).take(1).collect();
            if rest == "}" || rest == "]" {
                continue;
            }
        }
        result.push(c);
    }
    result
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTime {
    minutes: Option<u32>,
    time: Option<String>,
}

impl RawTime {
    fn into_change(self) -> Option<TimeChange> {
        if let Some(time) = self.time.as_deref().and_then(parse_time) {
            return Some(TimeChange::Set { time });
        }
        self.minutes.map(|minutes| TimeChange::Advanced { minutes })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLocation {
    area: Option<String>,
    place: Option<String>,
    position: Option<String>,
    location_type: Option<serde_json::Value>,
}

impl RawLocation {
    fn into_change(self) -> Option<LocationChange> {
        let place = self.place.filter(|p| !p.trim().is_empty())?;
        Some(LocationChange {
            area: self.area.unwrap_or_default(),
            place,
            position: self.position,
            location_type: self
                .location_type
                .and_then(|v| serde_json::from_value::<LocationType>(v).ok()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTopicTone {
    topic: String,
    tone: String,
}

#[derive(Debug, Deserialize)]
struct RawTension {
    level: TensionLevel,
    #[serde(default)]
    direction: TensionDirection,
    #[serde(default, rename = "type", alias = "kind")]
    kind: TensionType,
}

impl From<RawTension> for Tension {
    fn from(raw: RawTension) -> Self {
        Self {
            level: raw.level,
            direction: raw.direction,
            kind: raw.kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawArrival {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        position: Option<String>,
    },
}

impl From<RawArrival> for Arrival {
    fn from(raw: RawArrival) -> Self {
        match raw {
            RawArrival::Name(name) => Self {
                name,
                position: None,
            },
            RawArrival::Full { name, position } => Self { name, position },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPresence {
    appeared: Vec<RawArrival>,
    departed: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPosition {
    position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawActivity {
    activity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSlotChange {
    slot: String,
    #[serde(default)]
    item: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOutfit {
    changes: Vec<RawSlotChange>,
}

impl RawOutfit {
    fn into_changes(self) -> Vec<OutfitChange> {
        slot_changes(
            self.changes
                .into_iter()
                .map(|change| (change.slot, change.item))
                .collect(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProfile {
    age: Option<u32>,
    appearance: Vec<String>,
    personality: Vec<String>,
}

impl From<RawProfile> for CharacterProfile {
    fn from(raw: RawProfile) -> Self {
        Self {
            age: raw.age,
            appearance: raw.appearance,
            personality: raw.personality,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSubjects {
    pairs: Vec<NewRelationship>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAttitudes {
    a_to_b: ListChange,
    b_to_a: ListChange,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    status: RelationshipStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNarrative {
    beats: Vec<BeatProposal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChapter {
    ended: bool,
    title: String,
    summary: String,
}

#[derive(Debug, Deserialize)]
struct RawConsolidation {
    consolidated: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCharacter {
    name: String,
    position: Option<String>,
    activity: Option<String>,
    mood: Vec<String>,
    physical: Vec<String>,
    outfit: BTreeMap<String, Option<String>>,
    profile: Option<RawProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInitial {
    time: Option<String>,
    location: Option<RawLocation>,
    climate: Option<ClimateChange>,
    topic: Option<String>,
    tone: Option<String>,
    tension: Option<serde_json::Value>,
    characters: Vec<RawCharacter>,
    relationships: Vec<NewRelationship>,
}

#[cfg(test)]
mod tests {
    use storyline_core::extraction::ConsolidationTarget;

    use super::*;

    fn ada() -> Target {
        Target::Character("Ada".to_owned())
    }

    fn pair_target() -> Target {
        Target::Pair {
            a: "Ada".to_owned(),
            b: "Bo".to_owned(),
        }
    }

    #[test]
    fn json_recovery_strategies() {
        assert!(parse_json(r#"{"minutes": 5}"#).is_ok());
        assert!(parse_json("```json\n{\"minutes\": 5}\n```").is_ok());
        assert!(parse_json(r#"{"added": ["calm",], }"#).is_ok());
        assert!(parse_json("Sure! ```\n{\"a\": [1, 2,],}\n``` Hope that helps.").is_ok());
        assert!(parse_json("The answer is {\"minutes\": 5} as requested.").is_ok());
        assert!(matches!(
            parse_json("I think about ten minutes passed."),
            Err(RunnerError::Parse(_))
        ));
    }

    #[test]
    fn strip_trailing_commas_basic() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1, "b": 2,}"#), r#"{"a": 1, "b": 2}"#);
        assert_eq!(strip_trailing_commas("[1, 2, 3,\n]"), "[1, 2, 3\n]");
        assert_eq!(strip_trailing_commas(r#"{"a": "x, y"}"#), r#"{"a": "x, y"}"#);
    }

    #[test]
    fn time_prefers_explicit_jump() {
        let advanced = parse_extraction(ExtractorKind::Time, &Target::Scene, r#"{"minutes": 15}"#);
        assert_eq!(
            advanced.ok().flatten(),
            Some(Extraction::Time {
                change: TimeChange::Advanced { minutes: 15 }
            })
        );

        let set = parse_extraction(
            ExtractorKind::Time,
            &Target::Scene,
            r#"{"minutes": 15, "time": "2024-03-01 21:30"}"#,
        );
        assert!(matches!(
            set,
            Ok(Some(Extraction::Time {
                change: TimeChange::Set { .. }
            }))
        ));

        let nothing = parse_extraction(ExtractorKind::Time, &Target::Scene, "{}");
        assert!(matches!(nothing, Ok(None)));
    }

    #[test]
    fn presence_accepts_bare_names() {
        let raw = r#"{"appeared": ["Cy", {"name": "Dee", "position": "by the door"}], "departed": ["Bo"]}"#;
        let parsed = parse_extraction(ExtractorKind::Presence, &Target::Scene, raw);
        assert!(matches!(parsed, Ok(Some(Extraction::Presence { .. }))));
        let Ok(Some(Extraction::Presence { appeared, departed })) = parsed else {
            return;
        };
        assert_eq!(appeared.len(), 2);
        assert_eq!(appeared.first().map(|a| a.name.as_str()), Some("Cy"));
        assert_eq!(
            appeared.get(1).and_then(|a| a.position.as_deref()),
            Some("by the door")
        );
        assert_eq!(departed, vec!["Bo".to_owned()]);
    }

    #[test]
    fn outfit_skips_unknown_slots() {
        let raw = r#"{"changes": [
            {"slot": "head", "item": "wool cap"},
            {"slot": "tail", "item": "ribbon"},
            {"slot": "Footwear", "item": null}
        ]}"#;
        let parsed = parse_extraction(ExtractorKind::Outfit, &ada(), raw);
        assert!(matches!(parsed, Ok(Some(Extraction::Outfit { .. }))));
        let Ok(Some(Extraction::Outfit { character, changes })) = parsed else {
            return;
        };
        assert_eq!(character, "Ada");
        assert_eq!(
            changes,
            vec![
                OutfitChange {
                    slot: OutfitSlot::Head,
                    item: Some("wool cap".to_owned()),
                },
                OutfitChange {
                    slot: OutfitSlot::Footwear,
                    item: None,
                },
            ]
        );
    }

    #[test]
    fn attitudes_become_directional_changes() {
        let raw = r#"{"a_to_b": {"added": ["trust"]}, "b_to_a": {}}"#;
        let parsed = parse_extraction(ExtractorKind::Feelings, &pair_target(), raw);
        assert!(matches!(parsed, Ok(Some(Extraction::Feelings { .. }))));
        let Ok(Some(Extraction::Feelings { changes })) = parsed else {
            return;
        };
        assert_eq!(changes.len(), 1);
        let Some(change) = changes.first() else { return };
        assert_eq!((change.from.as_str(), change.to.as_str()), ("Ada", "Bo"));
        assert_eq!(change.change.added, vec!["trust".to_owned()]);
    }

    #[test]
    fn chapter_not_ended_is_none() {
        let parsed = parse_extraction(ExtractorKind::Chapter, &Target::Scene, r#"{"ended": false}"#);
        assert!(matches!(parsed, Ok(None)));

        let raw = r#"{"ended": true, "title": "Rain", "summary": "They wait out the storm."}"#;
        let parsed = parse_extraction(ExtractorKind::Chapter, &Target::Scene, raw);
        assert!(matches!(
            parsed,
            Ok(Some(Extraction::Chapter { ref chapter })) if chapter.title == "Rain"
        ));
    }

    #[test]
    fn mismatched_target_is_a_parse_error() {
        let result = parse_extraction(ExtractorKind::Mood, &Target::Scene, r#"{"added": []}"#);
        assert!(matches!(result, Err(RunnerError::Parse(_))));

        let result = parse_extraction(ExtractorKind::Status, &ada(), r#"{"status": "close"}"#);
        assert!(matches!(result, Err(RunnerError::Parse(_))));
    }

    #[test]
    fn tension_requires_known_level() {
        let ok = parse_extraction(
            ExtractorKind::Tension,
            &Target::Scene,
            r#"{"level": "tense", "direction": "escalating", "type": "confrontation"}"#,
        );
        assert!(matches!(
            ok,
            Ok(Some(Extraction::Tension { tension })) if tension.level == TensionLevel::Tense
        ));

        let bad = parse_extraction(ExtractorKind::Tension, &Target::Scene, r#"{"level": "spicy"}"#);
        assert!(matches!(bad, Err(RunnerError::Parse(_))));
    }

    #[test]
    fn consolidation_keeps_its_target() {
        let target = Target::List(ConsolidationTarget::Mood {
            character: "Bo".to_owned(),
        });
        let parsed = parse_extraction(
            ExtractorKind::MoodConsolidation,
            &target,
            r#"{"consolidated": ["uneasy", "tired"]}"#,
        );
        assert!(matches!(parsed, Ok(Some(Extraction::Consolidated { .. }))));
        let Ok(Some(Extraction::Consolidated { consolidation })) = parsed else {
            return;
        };
        assert_eq!(
            consolidation.target,
            ConsolidationTarget::Mood {
                character: "Bo".to_owned()
            }
        );
        assert_eq!(consolidation.consolidated.len(), 2);
    }

    #[test]
    fn initial_state_orders_arrivals_before_character_state() {
        let raw = r#"```json
{
  "time": "2024-03-01T20:00:00",
  "location": {"area": "Harbor", "place": "The Crooked Inn", "location_type": "heated"},
  "climate": {"weather": "rain", "temperature_c": 9},
  "topic": "shelter",
  "tone": "weary",
  "tension": {"level": "guarded", "type": "mystery"},
  "characters": [
    {"name": "Ada", "mood": ["tired"], "outfit": {"torso": "oilskin coat", "wings": "none"},
     "profile": {"age": 31, "personality": ["wry"]}},
    {"name": "Bo", "activity": "wiping the bar"}
  ],
  "relationships": [{"a": "Ada", "b": "Bo", "status": "acquaintances"}],
}
```"#;
        let parsed = parse_initial_state(raw);
        assert!(parsed.is_ok());
        let Ok(extractions) = parsed else { return };

        let presence = extractions
            .iter()
            .position(|e| matches!(e, Extraction::Presence { .. }));
        let first_mood = extractions
            .iter()
            .position(|e| matches!(e, Extraction::Mood { .. }));
        assert!(presence.is_some());
        assert!(presence < first_mood);
        assert!(matches!(extractions.last(), Some(Extraction::Subjects { .. })));
        assert!(extractions.iter().any(|e| matches!(
            e,
            Extraction::Location { location } if location.location_type == Some(LocationType::Heated)
        )));
        assert!(extractions.iter().any(|e| matches!(
            e,
            Extraction::Outfit { changes, .. } if changes.len() == 1
        )));
        assert!(extractions.iter().any(|e| matches!(
            e,
            Extraction::Tension { tension }
                if tension.level == TensionLevel::Guarded && tension.kind == TensionType::Mystery
        )));
    }

    #[test]
    fn unreadable_seed_tension_keeps_the_rest() {
        let raw = r#"{"topic": "cards", "tone": "easy", "tension": {"level": "spicy"},
                      "characters": [{"name": "Ada"}]}"#;
        let parsed = parse_initial_state(raw);
        assert!(parsed.is_ok());
        let Ok(extractions) = parsed else { return };

        assert!(!extractions.iter().any(|e| matches!(e, Extraction::Tension { .. })));
        assert!(extractions.iter().any(|e| matches!(e, Extraction::TopicTone { .. })));
        assert!(extractions.iter().any(|e| matches!(e, Extraction::Presence { .. })));
    }
}
