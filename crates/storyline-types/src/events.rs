//! The closed event tag set.
//!
//! Events are the only mutation unit for world state. Each [`Event`] carries
//! a two-level tag (`kind` then `subkind`) followed by the subkind's fields:
//!
//! ```json
//! {"kind": "character", "subkind": "mood_added", "name": "Ada", "value": "curious"}
//! ```
//!
//! Once appended to a store, an event is never edited.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventKind, LocationType, OutfitSlot, RelationshipStatus};
use crate::ids::EventId;
use crate::position::BranchPosition;
use crate::state::{CharacterProfile, Tension};

/// An immutable fact recorded at a branch position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique, time-ordered id.
    pub id: EventId,
    /// The message and swipe this event was extracted from.
    pub source: BranchPosition,
    /// Wall-clock time the event was minted.
    pub timestamp: DateTime<Utc>,
    /// Tagged payload.
    pub body: EventBody,
}

impl Event {
    /// Stamp a payload with a fresh id and the current time.
    pub fn new(source: BranchPosition, body: EventBody) -> Self {
        Self {
            id: EventId::new(),
            source,
            timestamp: Utc::now(),
            body,
        }
    }

    /// Top-level kind of the event.
    pub const fn kind(&self) -> EventKind {
        self.body.kind()
    }

    /// Subkind name, unique within its kind.
    pub const fn subkind(&self) -> &'static str {
        self.body.subkind()
    }

    /// Full `kind/subkind` tag, e.g. `character/appeared`.
    pub fn tag(&self) -> String {
        format!("{}/{}", self.kind().as_str(), self.subkind())
    }
}

/// Payload of an event, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventBody {
    /// See [`TimeEvent`].
    Time(TimeEvent),
    /// See [`LocationEvent`].
    Location(LocationEvent),
    /// See [`ClimateEvent`].
    Climate(ClimateEvent),
    /// See [`CharacterEvent`].
    Character(CharacterEvent),
    /// See [`RelationshipEvent`].
    Relationship(RelationshipEvent),
    /// See [`SceneEvent`].
    Scene(SceneEvent),
    /// See [`NarrativeEvent`].
    Narrative(NarrativeEvent),
    /// See [`ChapterEvent`].
    Chapter(ChapterEvent),
}

impl EventBody {
    /// Top-level kind of this payload.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Time(_) => EventKind::Time,
            Self::Location(_) => EventKind::Location,
            Self::Climate(_) => EventKind::Climate,
            Self::Character(_) => EventKind::Character,
            Self::Relationship(_) => EventKind::Relationship,
            Self::Scene(_) => EventKind::Scene,
            Self::Narrative(_) => EventKind::Narrative,
            Self::Chapter(_) => EventKind::Chapter,
        }
    }

    /// Subkind name of this payload.
    pub const fn subkind(&self) -> &'static str {
        match self {
            Self::Time(TimeEvent::Advanced { .. }) => "advanced",
            Self::Time(TimeEvent::Set { .. }) => "set",
            Self::Location(LocationEvent::Moved { .. }) => "moved",
            Self::Location(LocationEvent::PropAdded { .. }) => "prop_added",
            Self::Location(LocationEvent::PropRemoved { .. }) => "prop_removed",
            Self::Climate(ClimateEvent::Changed { .. }) => "changed",
            Self::Character(event) => match event {
                CharacterEvent::Appeared { .. } => "appeared",
                CharacterEvent::Departed { .. } => "departed",
                CharacterEvent::PositionChanged { .. } => "position_changed",
                CharacterEvent::ActivityChanged { .. } => "activity_changed",
                CharacterEvent::MoodAdded { .. } => "mood_added",
                CharacterEvent::MoodRemoved { .. } => "mood_removed",
                CharacterEvent::PhysicalAdded { .. } => "physical_added",
                CharacterEvent::PhysicalRemoved { .. } => "physical_removed",
                CharacterEvent::OutfitChanged { .. } => "outfit_changed",
                CharacterEvent::ProfileSet { .. } => "profile_set",
            },
            Self::Relationship(event) => match event {
                RelationshipEvent::Established { .. } => "established",
                RelationshipEvent::FeelingAdded { .. } => "feeling_added",
                RelationshipEvent::FeelingRemoved { .. } => "feeling_removed",
                RelationshipEvent::SecretAdded { .. } => "secret_added",
                RelationshipEvent::SecretRemoved { .. } => "secret_removed",
                RelationshipEvent::WantAdded { .. } => "want_added",
                RelationshipEvent::WantRemoved { .. } => "want_removed",
                RelationshipEvent::StatusChanged { .. } => "status_changed",
            },
            Self::Scene(SceneEvent::TopicToneChanged { .. }) => "topic_tone_changed",
            Self::Scene(SceneEvent::TensionChanged { .. }) => "tension_changed",
            Self::Narrative(NarrativeEvent::BeatRecorded { .. }) => "beat_recorded",
            Self::Chapter(ChapterEvent::Ended { .. }) => "ended",
        }
    }
}

/// Changes to the in-story clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TimeEvent {
    /// The clock moved forward.
    Advanced {
        /// Minutes elapsed.
        minutes: u32,
    },
    /// The clock jumped to an absolute time.
    Set {
        /// New in-story date and time.
        time: NaiveDateTime,
    },
}

/// Changes to where the scene takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LocationEvent {
    /// The scene moved.
    Moved {
        /// Broad area (city, region).
        area: String,
        /// Specific place within the area.
        place: String,
        /// Spot within the place.
        position: Option<String>,
        /// Indoor/outdoor classification.
        location_type: Option<LocationType>,
    },
    /// A notable object is now part of the scene.
    PropAdded {
        /// The object.
        prop: String,
    },
    /// An object is no longer part of the scene.
    PropRemoved {
        /// The object.
        prop: String,
    },
}

/// Changes to the weather.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClimateEvent {
    /// Weather or temperature changed.
    Changed {
        /// Free-form weather description.
        weather: Option<String>,
        /// Temperature in degrees Celsius.
        temperature_c: Option<i32>,
    },
}

/// Changes to a single character.
///
/// `name` matches an existing character case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CharacterEvent {
    /// A character entered the scene.
    Appeared {
        /// Display name.
        name: String,
        /// Where they are in the scene.
        position: Option<String>,
    },
    /// A character left the scene.
    Departed {
        /// Display name.
        name: String,
    },
    /// A character moved within the scene.
    PositionChanged {
        /// Display name.
        name: String,
        /// New position.
        position: String,
    },
    /// A character started or stopped doing something.
    ActivityChanged {
        /// Display name.
        name: String,
        /// New activity, or `None` when idle.
        activity: Option<String>,
    },
    /// A mood was added.
    MoodAdded {
        /// Display name.
        name: String,
        /// The mood.
        value: String,
    },
    /// A mood was removed.
    MoodRemoved {
        /// Display name.
        name: String,
        /// The mood.
        value: String,
    },
    /// A physical state was added.
    PhysicalAdded {
        /// Display name.
        name: String,
        /// The physical state.
        value: String,
    },
    /// A physical state was removed.
    PhysicalRemoved {
        /// Display name.
        name: String,
        /// The physical state.
        value: String,
    },
    /// A clothing slot changed.
    OutfitChanged {
        /// Display name.
        name: String,
        /// Affected slot.
        slot: OutfitSlot,
        /// New item, or `None` when the slot was emptied.
        item: Option<String>,
    },
    /// A character's static profile was recorded.
    ProfileSet {
        /// Display name.
        name: String,
        /// The profile.
        profile: CharacterProfile,
    },
}

/// Changes to a relationship between two characters.
///
/// Directional variants describe how `from` regards `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RelationshipEvent {
    /// Two characters now have a tracked relationship.
    Established {
        /// First character.
        a: String,
        /// Second character.
        b: String,
        /// Initial status.
        status: RelationshipStatus,
    },
    /// `from` gained a feeling toward `to`.
    FeelingAdded {
        /// Holder of the feeling.
        from: String,
        /// Target of the feeling.
        to: String,
        /// The feeling.
        value: String,
    },
    /// `from` lost a feeling toward `to`.
    FeelingRemoved {
        /// Holder of the feeling.
        from: String,
        /// Target of the feeling.
        to: String,
        /// The feeling.
        value: String,
    },
    /// `from` now keeps a secret from `to`.
    SecretAdded {
        /// Keeper of the secret.
        from: String,
        /// Who it is kept from.
        to: String,
        /// The secret.
        value: String,
    },
    /// A secret was revealed or dropped.
    SecretRemoved {
        /// Keeper of the secret.
        from: String,
        /// Who it was kept from.
        to: String,
        /// The secret.
        value: String,
    },
    /// `from` now wants something from `to`.
    WantAdded {
        /// Who wants it.
        from: String,
        /// From whom.
        to: String,
        /// The want.
        value: String,
    },
    /// A want was fulfilled or abandoned.
    WantRemoved {
        /// Who wanted it.
        from: String,
        /// From whom.
        to: String,
        /// The want.
        value: String,
    },
    /// The overall status changed.
    StatusChanged {
        /// First character.
        a: String,
        /// Second character.
        b: String,
        /// New status.
        status: RelationshipStatus,
    },
}

/// Changes to the scene's mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SceneEvent {
    /// Topic or tone shifted.
    TopicToneChanged {
        /// What the scene is about.
        topic: String,
        /// How it feels.
        tone: String,
    },
    /// Tension changed.
    TensionChanged {
        /// New tension reading.
        tension: Tension,
    },
}

/// Story beats worth remembering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum NarrativeEvent {
    /// A beat happened.
    BeatRecorded {
        /// One-line description.
        description: String,
        /// Characters involved.
        subjects: Vec<String>,
    },
}

/// Chapter boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "subkind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ChapterEvent {
    /// A chapter closed at this message.
    Ended {
        /// Chapter title.
        title: String,
        /// Short summary.
        summary: String,
        /// First message covered.
        start_message: u32,
        /// Last message covered.
        end_message: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_and_subkind() {
        let event = Event::new(
            BranchPosition::new(3, 0),
            EventBody::Character(CharacterEvent::MoodAdded {
                name: "Ada".to_owned(),
                value: "curious".to_owned(),
            }),
        );
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["body"]["kind"], "character");
        assert_eq!(json["body"]["subkind"], "mood_added");
        assert_eq!(json["body"]["value"], "curious");
        assert_eq!(event.tag(), "character/mood_added");

        let back: Result<Event, _> = serde_json::from_value(json);
        assert_eq!(back.ok(), Some(event));
    }

    #[test]
    fn unknown_subkind_is_rejected() {
        let json = serde_json::json!({"kind": "scene", "subkind": "exploded"});
        assert!(serde_json::from_value::<EventBody>(json).is_err());
    }
}
