//! Projection engine: a pure fold from snapshot plus events to world state.
//!
//! ```text
//! nearest snapshot --+
//! committed events --+--> fold --> prior projection --+
//!                                                     +--> fold --> turn projection
//!                           turn-local events --------+
//! ```
//!
//! The fold has no hidden inputs. The same snapshot and the same ordered
//! events always produce the same [`Projection`]. It never duplicates a list
//! entry (adds of a case-insensitively present value are skipped) and it
//! ignores events that address a character who is not in the scene.

use chrono::{NaiveDateTime, TimeDelta};
use storyline_store::{EventStore, Journal};
use storyline_types::{
    BranchPosition, Chapter, ChapterEvent, CharacterEvent, CharacterState, ClimateEvent,
    ClimateState, Event, EventBody, EventKind, LocationEvent, LocationState, NarrativeBeat,
    NarrativeEvent, PairKey, Relationship, RelationshipEvent, SceneEvent, SceneState, Snapshot,
    TimeEvent, contains_folded, fold_key,
};

use crate::error::ProjectionError;

/// Derived, read-only world state at a branch position.
///
/// Never persisted directly; [`Projection::into_snapshot`] turns one into a
/// replay checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    state: Snapshot,
}

impl Projection {
    /// Wrap a snapshot without applying anything.
    pub const fn from_snapshot(state: Snapshot) -> Self {
        Self { state }
    }

    /// Fold `events`, in order, onto `snapshot`.
    pub fn fold<'a>(snapshot: Snapshot, events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut projection = Self::from_snapshot(snapshot);
        for event in events {
            projection.apply(event);
        }
        projection
    }

    /// A copy of this projection with turn-local events folded on top.
    #[must_use]
    pub fn with_turn_events(&self, events: &[Event]) -> Self {
        let mut next = self.clone();
        for event in events {
            next.apply(event);
        }
        next
    }

    /// Pin the projection to `position`.
    #[must_use]
    pub fn at(mut self, position: BranchPosition) -> Self {
        self.state.position = position;
        self
    }

    /// Fold a single event.
    pub fn apply(&mut self, event: &Event) {
        apply_event(&mut self.state, event);
    }

    /// The underlying state.
    pub const fn snapshot(&self) -> &Snapshot {
        &self.state
    }

    /// Consume the projection, yielding a snapshot for the store.
    pub fn into_snapshot(self) -> Snapshot {
        self.state
    }

    /// Position this projection describes.
    pub const fn position(&self) -> BranchPosition {
        self.state.position
    }

    /// In-story time, once known.
    pub const fn time(&self) -> Option<NaiveDateTime> {
        self.state.time
    }

    /// Where the scene takes place.
    pub const fn location(&self) -> &LocationState {
        &self.state.location
    }

    /// Weather.
    pub const fn climate(&self) -> &ClimateState {
        &self.state.climate
    }

    /// Scene topic, tone, and tension.
    pub const fn scene(&self) -> &SceneState {
        &self.state.scene
    }

    /// A present character, looked up case-insensitively.
    pub fn character(&self, name: &str) -> Option<&CharacterState> {
        self.state.characters.get(&fold_key(name))
    }

    /// Whether `name` is in the scene.
    pub fn is_present(&self, name: &str) -> bool {
        self.state.characters.contains_key(&fold_key(name))
    }

    /// Present characters, ordered by folded name.
    pub fn characters(&self) -> impl Iterator<Item = &CharacterState> {
        self.state.characters.values()
    }

    /// Display names of present characters, ordered by folded name.
    pub fn character_names(&self) -> Vec<String> {
        self.characters().map(|c| c.name.clone()).collect()
    }

    /// Relationship between `a` and `b`, in either order.
    pub fn relationship(&self, a: &str, b: &str) -> Option<&Relationship> {
        self.state.relationships.get(&PairKey::new(a, b))
    }

    /// Every tracked relationship, ordered by pair key.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.state.relationships.values()
    }

    /// Relationships whose two members are both present.
    pub fn present_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships()
            .filter(|rel| self.is_present(&rel.a) && self.is_present(&rel.b))
    }

    /// Every clothing item worn by a present character.
    pub fn worn_items(&self) -> impl Iterator<Item = &String> {
        self.characters()
            .flat_map(|c| c.outfit.items().map(|(_, item)| item))
    }

    /// Most recent message that produced an event of any of `kinds`.
    pub fn last_event_message(&self, kinds: &[EventKind]) -> Option<u32> {
        kinds
            .iter()
            .filter_map(|kind| self.state.last_event_at.get(kind.as_str()).copied())
            .max()
    }

    /// Recorded story beats, oldest first.
    pub fn beats(&self) -> &[NarrativeBeat] {
        &self.state.beats
    }

    /// Closed chapters, oldest first.
    pub fn chapters(&self) -> &[Chapter] {
        &self.state.chapters
    }

    /// Last message covered by a closed chapter.
    pub fn last_chapter_end(&self) -> Option<u32> {
        self.state.chapters.last().map(|c| c.end_message)
    }
}

/// Last committed state at `tip`, excluding anything produced this pass.
///
/// # Errors
///
/// Returns [`ProjectionError::NoSnapshot`] when the branch was never
/// initialized, or [`ProjectionError::Store`] when `tip` is not active.
pub fn prior_projection<J: Journal>(
    store: &EventStore<J>,
    tip: BranchPosition,
) -> Result<Projection, ProjectionError> {
    let snapshot = store
        .nearest_snapshot(tip)?
        .ok_or(ProjectionError::NoSnapshot { position: tip })?;
    let events = store.events_since(snapshot.position, tip)?;
    Ok(Projection::fold(snapshot.clone(), events).at(tip))
}

/// Committed state at `tip` with this pass's `turn_events` folded on top.
///
/// # Errors
///
/// Same as [`prior_projection`].
pub fn project_with_turn_events<J: Journal>(
    store: &EventStore<J>,
    turn_events: &[Event],
    tip: BranchPosition,
) -> Result<Projection, ProjectionError> {
    Ok(prior_projection(store, tip)?.with_turn_events(turn_events))
}

/// Apply one event to a snapshot.
pub fn apply_event(state: &mut Snapshot, event: &Event) {
    if event.source > state.position {
        state.position = event.source;
    }
    let stamp = state
        .last_event_at
        .entry(event.kind().as_str().to_owned())
        .or_insert(event.source.message_id);
    *stamp = (*stamp).max(event.source.message_id);

    match &event.body {
        EventBody::Time(change) => apply_time(state, change),
        EventBody::Location(change) => apply_location(&mut state.location, change),
        EventBody::Climate(ClimateEvent::Changed {
            weather,
            temperature_c,
        }) => {
            if weather.is_some() {
                state.climate.weather.clone_from(weather);
            }
            if temperature_c.is_some() {
                state.climate.temperature_c = *temperature_c;
            }
        }
        EventBody::Character(change) => apply_character(state, change),
        EventBody::Relationship(change) => apply_relationship(state, change),
        EventBody::Scene(SceneEvent::TopicToneChanged { topic, tone }) => {
            state.scene.topic = Some(topic.clone());
            state.scene.tone = Some(tone.clone());
        }
        EventBody::Scene(SceneEvent::TensionChanged { tension }) => {
            state.scene.tension = *tension;
        }
        EventBody::Narrative(NarrativeEvent::BeatRecorded {
            description,
            subjects,
        }) => state.beats.push(NarrativeBeat {
            message_id: event.source.message_id,
            description: description.clone(),
            subjects: subjects.clone(),
        }),
        EventBody::Chapter(ChapterEvent::Ended {
            title,
            summary,
            start_message,
            end_message,
        }) => state.chapters.push(Chapter {
            title: title.clone(),
            summary: summary.clone(),
            start_message: *start_message,
            end_message: *end_message,
        }),
    }
}

fn apply_time(state: &mut Snapshot, change: &TimeEvent) {
    match change {
        TimeEvent::Advanced { minutes } => {
            let advanced = state.time.and_then(|now| {
                TimeDelta::try_minutes(i64::from(*minutes))
                    .and_then(|delta| now.checked_add_signed(delta))
            });
            if advanced.is_some() {
                state.time = advanced;
            }
        }
        TimeEvent::Set { time } => state.time = Some(*time),
    }
}

fn apply_location(location: &mut LocationState, change: &LocationEvent) {
    match change {
        LocationEvent::Moved {
            area,
            place,
            position,
            location_type,
        } => {
            let same_place = location
                .place
                .as_deref()
                .is_some_and(|current| fold_key(current) == fold_key(place));
            if !same_place {
                location.props.clear();
            }
            location.area = Some(area.clone());
            location.place = Some(place.clone());
            location.position.clone_from(position);
            if location_type.is_some() {
                location.location_type = *location_type;
            }
        }
        LocationEvent::PropAdded { prop } => add_folded(&mut location.props, prop),
        LocationEvent::PropRemoved { prop } => remove_folded(&mut location.props, prop),
    }
}

fn apply_character(state: &mut Snapshot, change: &CharacterEvent) {
    if let CharacterEvent::Appeared { name, position } = change {
        state
            .characters
            .entry(fold_key(name))
            .or_insert_with(|| CharacterState::new(name, position.clone()));
        return;
    }
    if let CharacterEvent::Departed { name } = change {
        state.characters.remove(&fold_key(name));
        return;
    }

    let name = match change {
        CharacterEvent::PositionChanged { name, .. }
        | CharacterEvent::ActivityChanged { name, .. }
        | CharacterEvent::MoodAdded { name, .. }
        | CharacterEvent::MoodRemoved { name, .. }
        | CharacterEvent::PhysicalAdded { name, .. }
        | CharacterEvent::PhysicalRemoved { name, .. }
        | CharacterEvent::OutfitChanged { name, .. }
        | CharacterEvent::ProfileSet { name, .. }
        | CharacterEvent::Appeared { name, .. }
        | CharacterEvent::Departed { name } => name,
    };
    let Some(character) = state.characters.get_mut(&fold_key(name)) else {
        return;
    };

    match change {
        CharacterEvent::PositionChanged { position, .. } => {
            character.position = Some(position.clone());
        }
        CharacterEvent::ActivityChanged { activity, .. } => {
            character.activity.clone_from(activity);
        }
        CharacterEvent::MoodAdded { value, .. } => add_folded(&mut character.mood, value),
        CharacterEvent::MoodRemoved { value, .. } => remove_folded(&mut character.mood, value),
        CharacterEvent::PhysicalAdded { value, .. } => add_folded(&mut character.physical, value),
        CharacterEvent::PhysicalRemoved { value, .. } => {
            remove_folded(&mut character.physical, value);
        }
        CharacterEvent::OutfitChanged { slot, item, .. } => {
            character.outfit.set(*slot, item.clone());
        }
        CharacterEvent::ProfileSet { profile, .. } => character.profile = Some(profile.clone()),
        CharacterEvent::Appeared { .. } | CharacterEvent::Departed { .. } => {}
    }
}

fn apply_relationship(state: &mut Snapshot, change: &RelationshipEvent) {
    match change {
        RelationshipEvent::Established { a, b, status } => {
            state
                .relationships
                .entry(PairKey::new(a, b))
                .or_insert_with(|| Relationship::new(a, b, *status));
        }
        RelationshipEvent::StatusChanged { a, b, status } => {
            if let Some(rel) = state.relationships.get_mut(&PairKey::new(a, b)) {
                rel.status = *status;
            }
        }
        RelationshipEvent::FeelingAdded { from, to, value }
        | RelationshipEvent::FeelingRemoved { from, to, value }
        | RelationshipEvent::SecretAdded { from, to, value }
        | RelationshipEvent::SecretRemoved { from, to, value }
        | RelationshipEvent::WantAdded { from, to, value }
        | RelationshipEvent::WantRemoved { from, to, value } => {
            let Some(attitude) = state
                .relationships
                .get_mut(&PairKey::new(from, to))
                .and_then(|rel| rel.attitude_mut(from))
            else {
                return;
            };
            match change {
                RelationshipEvent::FeelingAdded { .. } => add_folded(&mut attitude.feelings, value),
                RelationshipEvent::FeelingRemoved { .. } => {
                    remove_folded(&mut attitude.feelings, value);
                }
                RelationshipEvent::SecretAdded { .. } => add_folded(&mut attitude.secrets, value),
                RelationshipEvent::SecretRemoved { .. } => {
                    remove_folded(&mut attitude.secrets, value);
                }
                RelationshipEvent::WantAdded { .. } => add_folded(&mut attitude.wants, value),
                RelationshipEvent::WantRemoved { .. } => remove_folded(&mut attitude.wants, value),
                RelationshipEvent::Established { .. } | RelationshipEvent::StatusChanged { .. } => {}
            }
        }
    }
}

fn add_folded(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !contains_folded(list, value) {
        list.push(value.to_owned());
    }
}

fn remove_folded(list: &mut Vec<String>, value: &str) {
    let wanted = fold_key(value);
    list.retain(|entry| fold_key(entry) != wanted);
}
