//! Enumeration types shared by events and state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Top-level category of an event.
///
/// Each kind owns a closed set of subkinds (see [`crate::events::EventBody`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// In-story clock changes.
    Time,
    /// Scene location and props.
    Location,
    /// Weather and temperature.
    Climate,
    /// Per-character state.
    Character,
    /// Per-pair relationship state.
    Relationship,
    /// Scene topic, tone, and tension.
    Scene,
    /// Notable story beats.
    Narrative,
    /// Chapter boundaries.
    Chapter,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Time,
        Self::Location,
        Self::Climate,
        Self::Character,
        Self::Relationship,
        Self::Scene,
        Self::Narrative,
        Self::Chapter,
    ];

    /// Stable lowercase name used in tags and map keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Location => "location",
            Self::Climate => "climate",
            Self::Character => "character",
            Self::Relationship => "relationship",
            Self::Scene => "scene",
            Self::Narrative => "narrative",
            Self::Chapter => "chapter",
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

/// A clothing slot on a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OutfitSlot {
    /// Hats, helmets, hair pieces.
    Head,
    /// Necklaces, scarves, collars.
    Neck,
    /// Coats and jackets worn over the torso.
    Jacket,
    /// Backpacks, cloaks, capes.
    Back,
    /// Shirts, dresses, tops.
    Torso,
    /// Trousers, skirts, shorts.
    Legs,
    /// Underwear.
    Underwear,
    /// Socks and stockings.
    Socks,
    /// Shoes and boots.
    Footwear,
}

impl OutfitSlot {
    /// Every slot, head to toe.
    pub const ALL: [Self; 9] = [
        Self::Head,
        Self::Neck,
        Self::Jacket,
        Self::Back,
        Self::Torso,
        Self::Legs,
        Self::Underwear,
        Self::Socks,
        Self::Footwear,
    ];

    /// Stable lowercase name of the slot.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Neck => "neck",
            Self::Jacket => "jacket",
            Self::Back => "back",
            Self::Torso => "torso",
            Self::Legs => "legs",
            Self::Underwear => "underwear",
            Self::Socks => "socks",
            Self::Footwear => "footwear",
        }
    }

    /// Parse a slot name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|slot| slot.as_str() == lowered)
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Broad classification of where a scene takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LocationType {
    /// Open air.
    Outdoor,
    /// Inside a climate-controlled building.
    Modern,
    /// Inside a building warmed by a fire or stove.
    Heated,
    /// Inside a building with no heating.
    Unheated,
    /// Caves, cellars, tunnels.
    Underground,
    /// Tents and other thin shelters.
    Tent,
    /// Cars, carriages, ships.
    Vehicle,
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Overall status of a relationship between two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RelationshipStatus {
    /// Have just met or barely know each other.
    #[default]
    Strangers,
    /// Know each other casually.
    Acquaintances,
    /// Friends.
    Friendly,
    /// Close friends.
    Close,
    /// Romantically involved.
    Intimate,
    /// Mutually wary.
    Strained,
    /// Openly opposed.
    Hostile,
    /// Mixed or unclear.
    Complicated,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// How tense the current scene is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TensionLevel {
    /// Calm and at ease.
    #[default]
    Relaxed,
    /// Slight unease.
    Aware,
    /// Something is off.
    Guarded,
    /// Noticeable pressure.
    Tense,
    /// On edge.
    Charged,
    /// Near breaking point.
    Volatile,
    /// Open conflict or emergency.
    Explosive,
}

/// Whether tension is rising or falling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TensionDirection {
    /// Tension is increasing.
    Escalating,
    /// Tension is unchanged.
    #[default]
    Stable,
    /// Tension is easing.
    Decreasing,
}

/// What the tension in a scene is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TensionType {
    /// Ordinary conversation.
    #[default]
    Conversation,
    /// Disagreement or fight.
    Confrontation,
    /// Romantic or physical attraction.
    Intimate,
    /// Danger from outside the group.
    Danger,
    /// Unresolved questions.
    Mystery,
    /// Bargaining or persuasion.
    Negotiation,
    /// Something unexpected.
    Suspense,
    /// Cheerful or playful.
    Celebratory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_serde() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn outfit_slot_parse_is_case_insensitive() {
        assert_eq!(OutfitSlot::parse(" Footwear "), Some(OutfitSlot::Footwear));
        assert_eq!(OutfitSlot::parse("torso"), Some(OutfitSlot::Torso));
        assert_eq!(OutfitSlot::parse("wings"), None);
    }
}
