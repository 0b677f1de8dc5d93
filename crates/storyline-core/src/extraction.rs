//! Typed extractor outputs.
//!
//! Every extractor's parsed response becomes one [`Extraction`]. Validation
//! filters it against prior state and mapping turns whatever survives into
//! events. Nothing here carries an id or a timestamp yet.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use storyline_types::{CharacterProfile, LocationType, OutfitSlot, RelationshipStatus, Tension};

/// Proposed additions and removals for a list of free-form entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChange {
    /// Entries to add.
    #[serde(default)]
    pub added: Vec<String>,
    /// Entries to remove.
    #[serde(default)]
    pub removed: Vec<String>,
}

impl ListChange {
    /// Whether the change proposes nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A clock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeChange {
    /// Minutes elapsed since the previous message.
    Advanced {
        /// Minutes elapsed.
        minutes: u32,
    },
    /// An explicit jump to a date and time.
    Set {
        /// New in-story time.
        time: NaiveDateTime,
    },
}

/// A proposed scene location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationChange {
    /// Broad area.
    pub area: String,
    /// Specific place.
    pub place: String,
    /// Spot within the place.
    #[serde(default)]
    pub position: Option<String>,
    /// Indoor/outdoor classification.
    #[serde(default)]
    pub location_type: Option<LocationType>,
}

/// Proposed weather.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateChange {
    /// Weather description.
    #[serde(default)]
    pub weather: Option<String>,
    /// Temperature in degrees Celsius.
    #[serde(default)]
    pub temperature_c: Option<i32>,
}

/// A character entering the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Display name.
    pub name: String,
    /// Where they are.
    #[serde(default)]
    pub position: Option<String>,
}

/// A proposed clothing change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitChange {
    /// Affected slot.
    pub slot: OutfitSlot,
    /// New item, or `None` to empty the slot.
    #[serde(default)]
    pub item: Option<String>,
}

/// A directional change to one attitude list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttitudeChange {
    /// Holder of the attitude.
    pub from: String,
    /// Its target.
    pub to: String,
    /// Proposed list change.
    pub change: ListChange,
}

/// A pair proposed for relationship tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelationship {
    /// First character.
    pub a: String,
    /// Second character.
    pub b: String,
    /// Initial status.
    #[serde(default)]
    pub status: RelationshipStatus,
}

/// A proposed story beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatProposal {
    /// One-line description.
    pub description: String,
    /// Characters involved.
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// A proposed chapter boundary at the current message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterClose {
    /// Chapter title.
    pub title: String,
    /// Short summary.
    pub summary: String,
    /// First message covered. Filled in by validation.
    #[serde(default)]
    pub start_message: u32,
}

/// Which list a consolidation rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "list", rename_all = "snake_case")]
pub enum ConsolidationTarget {
    /// A character's moods.
    Mood {
        /// Display name.
        character: String,
    },
    /// A character's physical states.
    Physical {
        /// Display name.
        character: String,
    },
    /// Feelings of `from` toward `to`.
    Feelings {
        /// Holder.
        from: String,
        /// Target.
        to: String,
    },
    /// Wants of `from` toward `to`.
    Wants {
        /// Holder.
        from: String,
        /// Target.
        to: String,
    },
}

/// A rewritten list replacing near-duplicate entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consolidation {
    /// Which list.
    pub target: ConsolidationTarget,
    /// The list as it stood. Filled in by validation.
    #[serde(default)]
    pub previous: Vec<String>,
    /// The replacement list.
    pub consolidated: Vec<String>,
}

/// One extractor's parsed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "extraction", rename_all = "snake_case")]
pub enum Extraction {
    /// Clock change.
    Time {
        /// The change.
        change: TimeChange,
    },
    /// Scene location.
    Location {
        /// The proposed location.
        location: LocationChange,
    },
    /// Weather.
    Climate {
        /// The proposed weather.
        climate: ClimateChange,
    },
    /// Scene topic and tone.
    TopicTone {
        /// Topic.
        topic: String,
        /// Tone.
        tone: String,
    },
    /// Scene tension.
    Tension {
        /// The reading.
        tension: Tension,
    },
    /// Arrivals and departures.
    Presence {
        /// Characters entering.
        appeared: Vec<Arrival>,
        /// Characters leaving.
        departed: Vec<String>,
    },
    /// A character's position.
    Position {
        /// Display name.
        character: String,
        /// New position.
        position: String,
    },
    /// A character's activity.
    Activity {
        /// Display name.
        character: String,
        /// New activity, `None` when idle.
        activity: Option<String>,
    },
    /// A character's moods.
    Mood {
        /// Display name.
        character: String,
        /// Proposed change.
        change: ListChange,
    },
    /// A character's physical states.
    Physical {
        /// Display name.
        character: String,
        /// Proposed change.
        change: ListChange,
    },
    /// A character's clothing.
    Outfit {
        /// Display name.
        character: String,
        /// Per-slot changes.
        changes: Vec<OutfitChange>,
    },
    /// A character's static profile.
    Profile {
        /// Display name.
        character: String,
        /// The profile.
        profile: CharacterProfile,
    },
    /// Scene props.
    Props {
        /// Proposed change.
        change: ListChange,
    },
    /// Newly relevant character pairs.
    Subjects {
        /// Pairs to start tracking.
        pairs: Vec<NewRelationship>,
    },
    /// Feelings within one pair.
    Feelings {
        /// Per-direction changes.
        changes: Vec<AttitudeChange>,
    },
    /// Secrets within one pair.
    Secrets {
        /// Per-direction changes.
        changes: Vec<AttitudeChange>,
    },
    /// Wants within one pair.
    Wants {
        /// Per-direction changes.
        changes: Vec<AttitudeChange>,
    },
    /// Overall status of one pair.
    Status {
        /// First character.
        a: String,
        /// Second character.
        b: String,
        /// New status.
        status: RelationshipStatus,
    },
    /// Story beats.
    Narrative {
        /// Proposed beats.
        beats: Vec<BeatProposal>,
    },
    /// Chapter boundary.
    Chapter {
        /// The boundary.
        chapter: ChapterClose,
    },
    /// List consolidation.
    Consolidated {
        /// The rewrite.
        consolidation: Consolidation,
    },
}
