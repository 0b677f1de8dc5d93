//! Materialized world state.
//!
//! A [`Snapshot`] is the full state at a branch position. The event store
//! keeps snapshots as replay checkpoints; projections are built by folding
//! events onto one.
//!
//! Character names and list entries compare case-insensitively. Maps are
//! keyed by [`fold_key`] so that "Ada" and "ada" address the same character.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    LocationType, OutfitSlot, RelationshipStatus, TensionDirection, TensionLevel, TensionType,
};
use crate::position::BranchPosition;

/// Normalize a name or list entry for case-insensitive comparison.
pub fn fold_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Whether `list` holds `value`, ignoring case and surrounding whitespace.
pub fn contains_folded(list: &[String], value: &str) -> bool {
    let wanted = fold_key(value);
    list.iter().any(|entry| fold_key(entry) == wanted)
}

/// Full state at a branch position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// Position this state is current for.
    pub position: BranchPosition,
    /// In-story date and time, once known.
    pub time: Option<NaiveDateTime>,
    /// Where the scene takes place.
    pub location: LocationState,
    /// Weather.
    pub climate: ClimateState,
    /// Characters present in the scene, keyed by folded name.
    pub characters: BTreeMap<String, CharacterState>,
    /// Tracked relationships, keyed by unordered pair.
    pub relationships: BTreeMap<PairKey, Relationship>,
    /// Scene topic, tone, and tension.
    pub scene: SceneState,
    /// Recorded story beats, oldest first.
    pub beats: Vec<NarrativeBeat>,
    /// Closed chapters, oldest first.
    pub chapters: Vec<Chapter>,
    /// Message id of the latest event of each kind, keyed by kind name.
    pub last_event_at: BTreeMap<String, u32>,
}

impl Snapshot {
    /// An empty world at `position`.
    pub fn empty(position: BranchPosition) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Where the scene takes place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationState {
    /// Broad area (city, region).
    pub area: Option<String>,
    /// Specific place within the area.
    pub place: Option<String>,
    /// Spot within the place.
    pub position: Option<String>,
    /// Indoor/outdoor classification.
    pub location_type: Option<LocationType>,
    /// Notable objects in the scene.
    pub props: Vec<String>,
}

/// Weather at the scene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClimateState {
    /// Free-form weather description.
    pub weather: Option<String>,
    /// Temperature in degrees Celsius.
    pub temperature_c: Option<i32>,
}

/// State of one present character.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterState {
    /// Display name as first seen.
    pub name: String,
    /// Where they are in the scene.
    pub position: Option<String>,
    /// What they are doing.
    pub activity: Option<String>,
    /// Current moods.
    pub mood: Vec<String>,
    /// Current physical states (injuries, tiredness, ...).
    pub physical: Vec<String>,
    /// What they are wearing.
    pub outfit: Outfit,
    /// Static profile, once extracted.
    pub profile: Option<CharacterProfile>,
}

impl CharacterState {
    /// A freshly arrived character.
    pub fn new(name: &str, position: Option<String>) -> Self {
        Self {
            name: name.trim().to_owned(),
            position,
            ..Self::default()
        }
    }
}

/// Clothing per slot. `None` means the slot is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Outfit {
    /// Head slot.
    pub head: Option<String>,
    /// Neck slot.
    pub neck: Option<String>,
    /// Jacket slot.
    pub jacket: Option<String>,
    /// Back slot.
    pub back: Option<String>,
    /// Torso slot.
    pub torso: Option<String>,
    /// Legs slot.
    pub legs: Option<String>,
    /// Underwear slot.
    pub underwear: Option<String>,
    /// Socks slot.
    pub socks: Option<String>,
    /// Footwear slot.
    pub footwear: Option<String>,
}

impl Outfit {
    /// Item in `slot`, if any.
    pub const fn get(&self, slot: OutfitSlot) -> Option<&String> {
        match slot {
            OutfitSlot::Head => self.head.as_ref(),
            OutfitSlot::Neck => self.neck.as_ref(),
            OutfitSlot::Jacket => self.jacket.as_ref(),
            OutfitSlot::Back => self.back.as_ref(),
            OutfitSlot::Torso => self.torso.as_ref(),
            OutfitSlot::Legs => self.legs.as_ref(),
            OutfitSlot::Underwear => self.underwear.as_ref(),
            OutfitSlot::Socks => self.socks.as_ref(),
            OutfitSlot::Footwear => self.footwear.as_ref(),
        }
    }

    /// Replace the item in `slot`.
    pub fn set(&mut self, slot: OutfitSlot, item: Option<String>) {
        let target = match slot {
            OutfitSlot::Head => &mut self.head,
            OutfitSlot::Neck => &mut self.neck,
            OutfitSlot::Jacket => &mut self.jacket,
            OutfitSlot::Back => &mut self.back,
            OutfitSlot::Torso => &mut self.torso,
            OutfitSlot::Legs => &mut self.legs,
            OutfitSlot::Underwear => &mut self.underwear,
            OutfitSlot::Socks => &mut self.socks,
            OutfitSlot::Footwear => &mut self.footwear,
        };
        *target = item;
    }

    /// Every worn item with its slot, head to toe.
    pub fn items(&self) -> impl Iterator<Item = (OutfitSlot, &String)> {
        OutfitSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|item| (slot, item)))
    }
}

/// Static facts about a character that rarely change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterProfile {
    /// Apparent age in years.
    pub age: Option<u32>,
    /// Notable appearance traits.
    pub appearance: Vec<String>,
    /// Notable personality traits.
    pub personality: Vec<String>,
}

/// Key for an unordered pair of characters.
///
/// Built from folded names in sorted order, so `(Ada, Bo)` and `(bo, ada)`
/// produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PairKey(pub String);

impl PairKey {
    /// Key for the pair `a`, `b` in either order.
    pub fn new(a: &str, b: &str) -> Self {
        let (a, b) = (fold_key(a), fold_key(b));
        if a <= b {
            Self(format!("{a}|{b}"))
        } else {
            Self(format!("{b}|{a}"))
        }
    }

    /// Whether `name` is one of the two members.
    pub fn involves(&self, name: &str) -> bool {
        let name = fold_key(name);
        self.0.split('|').any(|member| member == name)
    }
}

impl core::fmt::Display for PairKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How one character regards another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attitude {
    /// Feelings held toward the other.
    pub feelings: Vec<String>,
    /// Secrets kept from the other.
    pub secrets: Vec<String>,
    /// Things wanted from the other.
    pub wants: Vec<String>,
}

/// A tracked relationship between two characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Relationship {
    /// First member's display name.
    pub a: String,
    /// Second member's display name.
    pub b: String,
    /// How `a` regards `b`.
    pub a_to_b: Attitude,
    /// How `b` regards `a`.
    pub b_to_a: Attitude,
    /// Overall status.
    pub status: RelationshipStatus,
}

impl Relationship {
    /// A new relationship with empty attitudes.
    pub fn new(a: &str, b: &str, status: RelationshipStatus) -> Self {
        Self {
            a: a.trim().to_owned(),
            b: b.trim().to_owned(),
            a_to_b: Attitude::default(),
            b_to_a: Attitude::default(),
            status,
        }
    }

    /// The attitude held by `from`, if `from` is a member.
    pub fn attitude(&self, from: &str) -> Option<&Attitude> {
        let from = fold_key(from);
        if fold_key(&self.a) == from {
            Some(&self.a_to_b)
        } else if fold_key(&self.b) == from {
            Some(&self.b_to_a)
        } else {
            None
        }
    }

    /// Mutable access to the attitude held by `from`.
    pub fn attitude_mut(&mut self, from: &str) -> Option<&mut Attitude> {
        let from = fold_key(from);
        if fold_key(&self.a) == from {
            Some(&mut self.a_to_b)
        } else if fold_key(&self.b) == from {
            Some(&mut self.b_to_a)
        } else {
            None
        }
    }
}

/// Scene topic, tone, and tension.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SceneState {
    /// What the scene is about.
    pub topic: Option<String>,
    /// How it feels.
    pub tone: Option<String>,
    /// Current tension.
    pub tension: Tension,
}

/// A tension reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tension {
    /// How tense.
    pub level: TensionLevel,
    /// Rising or falling.
    pub direction: TensionDirection,
    /// About what.
    pub kind: TensionType,
}

/// A recorded story beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NarrativeBeat {
    /// Message the beat happened in.
    pub message_id: u32,
    /// One-line description.
    pub description: String,
    /// Characters involved.
    pub subjects: Vec<String>,
}

/// A closed chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Chapter {
    /// Chapter title.
    pub title: String,
    /// Short summary.
    pub summary: String,
    /// First message covered.
    pub start_message: u32,
    /// Last message covered.
    pub end_message: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_order_and_case() {
        assert_eq!(PairKey::new("Ada", "Bo"), PairKey::new("bo", " ADA "));
        assert!(PairKey::new("Ada", "Bo").involves("BO"));
        assert!(!PairKey::new("Ada", "Bo").involves("Cy"));
    }

    #[test]
    fn attitude_lookup_is_directional() {
        let mut rel = Relationship::new("Ada", "Bo", RelationshipStatus::Friendly);
        if let Some(attitude) = rel.attitude_mut("ada") {
            attitude.feelings.push("trust".to_owned());
        }
        assert_eq!(
            rel.attitude("Ada").map(|a| a.feelings.clone()),
            Some(vec!["trust".to_owned()])
        );
        assert_eq!(rel.attitude("Bo").map(|a| a.feelings.len()), Some(0));
        assert!(rel.attitude("Cy").is_none());
    }

    #[test]
    fn outfit_items_skip_empty_slots() {
        let mut outfit = Outfit::default();
        outfit.set(OutfitSlot::Footwear, Some("boots".to_owned()));
        outfit.set(OutfitSlot::Head, Some("hat".to_owned()));
        let items: Vec<_> = outfit.items().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items.first().map(|(slot, _)| *slot), Some(OutfitSlot::Head));
    }

    #[test]
    fn snapshot_serializes_relationship_keys_as_strings() {
        let mut snapshot = Snapshot::empty(BranchPosition::new(0, 0));
        snapshot.relationships.insert(
            PairKey::new("Ada", "Bo"),
            Relationship::new("Ada", "Bo", RelationshipStatus::Strangers),
        );
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        assert!(json.contains("\"ada|bo\""));
        let back: Result<Snapshot, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(snapshot));
    }
}
