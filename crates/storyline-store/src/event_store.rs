//! Branch-aware event log with replay checkpoints.
//!
//! A chat is a tree: every message may have several swipe variants, and
//! exactly one of them is active. The store keeps events and snapshots per
//! [`BranchPosition`] and answers every read through the active swipe map,
//! so callers only ever see the visible branch.
//!
//! Events and snapshots live in ordered maps keyed by position. Reading the
//! events after a snapshot is a range scan over that suffix only, which keeps
//! replay proportional to the events since the nearest checkpoint.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use storyline_types::{BranchPosition, Event, EventId, Snapshot};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::journal::{Journal, JournalRecord, MemoryJournal};

/// Event log for one chat.
#[derive(Debug)]
pub struct EventStore<J = MemoryJournal> {
    journal: J,
    /// Message id to active swipe id.
    active: BTreeMap<u32, u32>,
    events: BTreeMap<BranchPosition, Vec<Event>>,
    snapshots: BTreeMap<BranchPosition, Snapshot>,
    ids: HashSet<EventId>,
}

impl EventStore<MemoryJournal> {
    /// An empty store backed by an in-memory journal.
    pub fn in_memory() -> Self {
        Self::empty(MemoryJournal::new())
    }
}

impl<J: Journal> EventStore<J> {
    /// Open a store by replaying everything in `journal`.
    pub fn open(mut journal: J) -> Result<Self, StoreError> {
        let records = journal.replay()?;
        let count = records.len();
        let mut store = Self::empty(journal);
        for record in records {
            store.apply(record);
        }
        info!(
            records = count,
            events = store.ids.len(),
            snapshots = store.snapshots.len(),
            "event store opened"
        );
        Ok(store)
    }

    fn empty(journal: J) -> Self {
        Self {
            journal,
            active: BTreeMap::new(),
            events: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            ids: HashSet::new(),
        }
    }

    /// The journal backing this store.
    pub const fn journal(&self) -> &J {
        &self.journal
    }

    /// Whether `position` is on the visible branch.
    pub fn is_active(&self, position: BranchPosition) -> bool {
        self.active.get(&position.message_id) == Some(&position.swipe_id)
    }

    /// Active swipe for `message_id`, if that message has been seen.
    pub fn active_swipe(&self, message_id: u32) -> Option<u32> {
        self.active.get(&message_id).copied()
    }

    /// Make `position` the visible swipe for its message.
    ///
    /// Switching an already-seen message to a different swipe abandons the
    /// continuation: data recorded for every later message is dropped. Data
    /// of the previous swipe itself is kept so switching back is free.
    pub fn activate(&mut self, position: BranchPosition) -> Result<(), StoreError> {
        if self.is_active(position) {
            return Ok(());
        }
        let record = JournalRecord::Activated { position };
        self.journal.append(&record)?;
        self.apply(record);
        Ok(())
    }

    /// Commit a turn's events at `position`.
    ///
    /// All checks run before anything is written, so a rejected call leaves
    /// the store untouched. An empty batch is still recorded: it marks the
    /// message as extracted.
    pub fn append(&mut self, position: BranchPosition, events: Vec<Event>) -> Result<(), StoreError> {
        if !self.is_active(position) {
            return Err(StoreError::NoActiveBranch { position });
        }
        let mut batch = HashSet::with_capacity(events.len());
        for event in &events {
            if event.source != position {
                return Err(StoreError::SourceMismatch {
                    id: event.id,
                    expected: position,
                    found: event.source,
                });
            }
            if self.ids.contains(&event.id) || !batch.insert(event.id) {
                return Err(StoreError::DuplicateEvent { id: event.id });
            }
        }
        let count = events.len();
        let record = JournalRecord::Appended { position, events };
        self.journal.append(&record)?;
        self.apply(record);
        debug!(%position, count, "appended events");
        Ok(())
    }

    /// Active events up to and including message `tip.message_id`, in order.
    ///
    /// The iterator is finite and can be cloned to restart it.
    pub fn active_events(
        &self,
        tip: BranchPosition,
    ) -> Result<impl Iterator<Item = &Event> + Clone + '_, StoreError> {
        self.ensure_active(tip)?;
        Ok(self.active_range(..=BranchPosition::end_of_message(tip.message_id)))
    }

    /// Latest active snapshot at or before message `tip.message_id`.
    ///
    /// `Ok(None)` means the branch has never been initialized.
    pub fn nearest_snapshot(&self, tip: BranchPosition) -> Result<Option<&Snapshot>, StoreError> {
        self.ensure_active(tip)?;
        Ok(self
            .snapshots
            .range(..=BranchPosition::end_of_message(tip.message_id))
            .rev()
            .find(|(position, _)| self.is_active(**position))
            .map(|(_, snapshot)| snapshot))
    }

    /// Active events after message `after.message_id` up to `tip`.
    ///
    /// Pair with [`Self::nearest_snapshot`]: `after` is the snapshot's
    /// position, so the snapshot plus these events is the state at `tip`.
    pub fn events_since(
        &self,
        after: BranchPosition,
        tip: BranchPosition,
    ) -> Result<impl Iterator<Item = &Event> + Clone + '_, StoreError> {
        self.ensure_active(tip)?;
        let upper = BranchPosition::end_of_message(tip.message_id);
        let lower = BranchPosition::end_of_message(after.message_id.min(tip.message_id));
        Ok(self.active_range((Bound::Excluded(lower), Bound::Included(upper))))
    }

    /// Number of active events recorded after the nearest snapshot.
    pub fn events_since_snapshot(&self, tip: BranchPosition) -> Result<usize, StoreError> {
        match self.nearest_snapshot(tip)?.map(|s| s.position) {
            Some(at) => Ok(self.events_since(at, tip)?.count()),
            None => Ok(self.active_events(tip)?.count()),
        }
    }

    /// Store a replay checkpoint at the snapshot's position.
    pub fn put_snapshot(&mut self, snapshot: Snapshot) -> Result<(), StoreError> {
        let position = snapshot.position;
        self.ensure_active(position)?;
        let record = JournalRecord::Snapshot {
            snapshot: Box::new(snapshot),
        };
        self.journal.append(&record)?;
        self.apply(record);
        debug!(%position, "stored snapshot");
        Ok(())
    }

    /// Drop every event and snapshot at or after `from_message`.
    ///
    /// Used when a message is edited or regenerated. The active swipe map is
    /// left alone: the messages are still visible, they just need
    /// re-extracting.
    pub fn truncate(&mut self, from_message: u32) -> Result<(), StoreError> {
        let record = JournalRecord::Truncated { from_message };
        self.journal.append(&record)?;
        self.apply(record);
        info!(from_message, "truncated event log");
        Ok(())
    }

    /// Whether a pass or a snapshot has been recorded for exactly `position`.
    pub fn has_entries_at(&self, position: BranchPosition) -> bool {
        self.events.contains_key(&position) || self.snapshots.contains_key(&position)
    }

    fn ensure_active(&self, position: BranchPosition) -> Result<(), StoreError> {
        if self.is_active(position) {
            Ok(())
        } else {
            Err(StoreError::NoActiveBranch { position })
        }
    }

    fn active_range<R>(&self, range: R) -> impl Iterator<Item = &Event> + Clone + '_
    where
        R: std::ops::RangeBounds<BranchPosition>,
    {
        self.events
            .range(range)
            .filter(|(position, _)| self.is_active(**position))
            .flat_map(|(_, events)| events.iter())
    }

    /// Apply a record that is already durable (or being replayed).
    fn apply(&mut self, record: JournalRecord) {
        match record {
            JournalRecord::Activated { position } => {
                let previous = self.active.insert(position.message_id, position.swipe_id);
                if previous.is_some_and(|swipe| swipe != position.swipe_id) {
                    self.drop_after(position.message_id);
                }
            }
            JournalRecord::Appended { position, events } => {
                self.ids.extend(events.iter().map(|e| e.id));
                self.events.entry(position).or_default().extend(events);
            }
            JournalRecord::Snapshot { snapshot } => {
                let position = snapshot.position;
                self.snapshots.insert(position, *snapshot);
                self.prune_snapshots(position);
            }
            JournalRecord::Truncated { from_message } => {
                let cut = BranchPosition::new(from_message, 0);
                let dropped = self.events.split_off(&cut);
                for event in dropped.values().flatten() {
                    self.ids.remove(&event.id);
                }
                self.snapshots.retain(|position, _| *position < cut);
            }
        }
    }

    /// Drop visible checkpoints made redundant by the one at `latest`.
    ///
    /// The earliest visible snapshot (the seed) and the one just before
    /// `latest` are kept so truncation always has a checkpoint to fall back
    /// to. Snapshots of inactive swipes are left for switching back.
    fn prune_snapshots(&mut self, latest: BranchPosition) {
        let earlier: Vec<BranchPosition> = self
            .snapshots
            .range(..latest)
            .map(|(position, _)| *position)
            .filter(|position| self.is_active(*position))
            .collect();
        if let [_, superseded @ .., _] = earlier.as_slice() {
            for position in superseded {
                self.snapshots.remove(position);
            }
            debug!(%latest, pruned = superseded.len(), "pruned superseded snapshots");
        }
    }

    /// Forget every message after `message_id`, including its swipe choice.
    fn drop_after(&mut self, message_id: u32) {
        let Some(next) = message_id.checked_add(1) else {
            return;
        };
        let cut = BranchPosition::new(next, 0);
        let dropped = self.events.split_off(&cut);
        for event in dropped.values().flatten() {
            self.ids.remove(&event.id);
        }
        self.snapshots.retain(|position, _| *position < cut);
        self.active.retain(|message, _| *message < next);
        debug!(message_id, "abandoned continuation after swipe change");
    }
}

#[cfg(test)]
mod tests {
    use storyline_types::{CharacterEvent, EventBody, SceneEvent};

    use super::*;

    fn mood(position: BranchPosition, value: &str) -> Event {
        Event::new(
            position,
            EventBody::Character(CharacterEvent::MoodAdded {
                name: "Ada".to_owned(),
                value: value.to_owned(),
            }),
        )
    }

    fn topic(position: BranchPosition, topic: &str) -> Event {
        Event::new(
            position,
            EventBody::Scene(SceneEvent::TopicToneChanged {
                topic: topic.to_owned(),
                tone: "calm".to_owned(),
            }),
        )
    }

    fn store_with(positions: &[BranchPosition]) -> EventStore {
        let mut store = EventStore::in_memory();
        for position in positions {
            assert!(store.activate(*position).is_ok());
        }
        store
    }

    #[test]
    fn append_then_read_returns_same_events_in_order() {
        let at = BranchPosition::new(0, 0);
        let mut store = store_with(&[at]);
        let events = vec![mood(at, "calm"), topic(at, "tea"), mood(at, "sleepy")];

        assert!(store.append(at, events.clone()).is_ok());

        let read: Vec<Event> = store
            .active_events(at)
            .map(|it| it.cloned().collect())
            .unwrap_or_default();
        assert_eq!(read, events);
    }

    #[test]
    fn active_events_iterator_restarts() {
        let at = BranchPosition::new(0, 0);
        let mut store = store_with(&[at]);
        assert!(store.append(at, vec![mood(at, "calm")]).is_ok());

        let iter = store.active_events(at);
        assert!(iter.is_ok());
        let Ok(iter) = iter else { return };
        assert_eq!(iter.clone().count(), 1);
        assert_eq!(iter.count(), 1);
    }

    #[test]
    fn append_to_inactive_swipe_fails() {
        let at = BranchPosition::new(0, 0);
        let mut store = store_with(&[at]);
        let stale = BranchPosition::new(0, 1);

        let result = store.append(stale, vec![mood(stale, "calm")]);
        assert!(matches!(result, Err(StoreError::NoActiveBranch { .. })));
    }

    #[test]
    fn append_rejects_mismatched_source_and_duplicates_without_writing() {
        let at = BranchPosition::new(0, 0);
        let mut store = store_with(&[at]);
        let other = BranchPosition::new(1, 0);

        let result = store.append(at, vec![mood(at, "calm"), mood(other, "sad")]);
        assert!(matches!(result, Err(StoreError::SourceMismatch { .. })));
        assert_eq!(store.active_events(at).map(Iterator::count).ok(), Some(0));

        let event = mood(at, "calm");
        assert!(store.append(at, vec![event.clone()]).is_ok());
        let result = store.append(at, vec![event]);
        assert!(matches!(result, Err(StoreError::DuplicateEvent { .. })));
        assert_eq!(store.journal().records().len(), 2);
    }

    #[test]
    fn empty_append_marks_message_extracted() {
        let at = BranchPosition::new(3, 0);
        let mut store = store_with(&[at]);
        assert!(!store.has_entries_at(at));

        assert!(store.append(at, Vec::new()).is_ok());
        assert!(store.has_entries_at(at));
        assert_eq!(store.active_events(at).map(Iterator::count).ok(), Some(0));
    }

    #[test]
    fn uninitialized_branch_has_no_snapshot() {
        let at = BranchPosition::new(0, 0);
        let store = store_with(&[at]);
        assert!(matches!(store.nearest_snapshot(at), Ok(None)));
    }

    #[test]
    fn replay_starts_at_nearest_snapshot() {
        let positions: Vec<_> = (0..4).map(|m| BranchPosition::new(m, 0)).collect();
        let mut store = store_with(&positions);
        for position in &positions {
            assert!(store.append(*position, vec![mood(*position, "calm")]).is_ok());
        }
        let at_two = BranchPosition::new(2, 0);
        assert!(store.put_snapshot(Snapshot::empty(at_two)).is_ok());

        let tip = BranchPosition::new(3, 0);
        let snapshot_at = store.nearest_snapshot(tip).ok().flatten().map(|s| s.position);
        assert_eq!(snapshot_at, Some(at_two));

        let since: Vec<u32> = store
            .events_since(at_two, tip)
            .map(|it| it.map(|e| e.source.message_id).collect())
            .unwrap_or_default();
        assert_eq!(since, vec![3]);
        assert_eq!(store.events_since_snapshot(tip).ok(), Some(1));

        // A tip before the snapshot sees nothing after it.
        let early = BranchPosition::new(1, 0);
        assert_eq!(store.events_since(at_two, early).map(Iterator::count).ok(), Some(0));
    }

    #[test]
    fn switching_swipe_abandons_later_messages() {
        let first = BranchPosition::new(0, 0);
        let second = BranchPosition::new(1, 0);
        let third = BranchPosition::new(2, 0);
        let mut store = store_with(&[first, second, third]);
        assert!(store.append(second, vec![mood(second, "calm")]).is_ok());
        assert!(store.append(third, vec![mood(third, "sad")]).is_ok());

        let swiped = BranchPosition::new(1, 1);
        assert!(store.activate(swiped).is_ok());

        assert!(!store.is_active(second));
        assert_eq!(store.active_swipe(2), None);
        assert!(matches!(
            store.append(third, vec![mood(third, "sad")]),
            Err(StoreError::NoActiveBranch { .. })
        ));
        assert_eq!(store.active_events(swiped).map(Iterator::count).ok(), Some(0));

        // Going back to the old swipe restores its own events.
        assert!(store.activate(second).is_ok());
        assert_eq!(store.active_events(second).map(Iterator::count).ok(), Some(1));
    }

    #[test]
    fn truncate_drops_events_and_snapshots_from_message() {
        let positions: Vec<_> = (0..3).map(|m| BranchPosition::new(m, 0)).collect();
        let mut store = store_with(&positions);
        for position in &positions {
            assert!(store.append(*position, vec![mood(*position, "calm")]).is_ok());
        }
        let last = BranchPosition::new(2, 0);
        assert!(store.put_snapshot(Snapshot::empty(last)).is_ok());

        assert!(store.truncate(1).is_ok());

        assert_eq!(store.active_events(last).map(Iterator::count).ok(), Some(1));
        assert!(matches!(store.nearest_snapshot(last), Ok(None)));
        assert!(store.is_active(last));
        assert!(!store.has_entries_at(BranchPosition::new(1, 0)));
    }

    #[test]
    fn superseded_snapshots_are_pruned() {
        let positions: Vec<_> = (0..8).map(|m| BranchPosition::new(m, 0)).collect();
        let mut store = store_with(&positions);
        for message in [0, 2, 4, 6] {
            let at = BranchPosition::new(message, 0);
            assert!(store.append(at, vec![mood(at, "calm")]).is_ok());
            assert!(store.put_snapshot(Snapshot::empty(at)).is_ok());
        }

        let kept: Vec<u32> = store.snapshots.keys().map(|p| p.message_id).collect();
        assert_eq!(kept, vec![0, 4, 6]);
        assert!(store.has_entries_at(BranchPosition::new(2, 0)));

        let reopened = EventStore::open(store.journal().clone());
        assert!(reopened.is_ok());
        let Ok(reopened) = reopened else { return };
        assert_eq!(reopened.snapshots.len(), 3);

        let tip = BranchPosition::new(5, 0);
        assert!(store.truncate(5).is_ok());
        let nearest = store.nearest_snapshot(tip).ok().flatten().map(|s| s.position);
        assert_eq!(nearest, Some(BranchPosition::new(4, 0)));

        assert!(store.truncate(3).is_ok());
        let nearest = store.nearest_snapshot(tip).ok().flatten().map(|s| s.position);
        assert_eq!(nearest, Some(BranchPosition::new(0, 0)));
        assert_eq!(store.events_since_snapshot(tip).ok(), Some(1));
    }

    #[test]
    fn reopening_replays_the_journal() {
        let at = BranchPosition::new(0, 0);
        let mut store = store_with(&[at]);
        let events = vec![mood(at, "calm")];
        assert!(store.append(at, events.clone()).is_ok());
        assert!(store.put_snapshot(Snapshot::empty(at)).is_ok());

        let journal = store.journal().clone();
        let reopened = EventStore::open(journal);
        assert!(reopened.is_ok());
        let Ok(reopened) = reopened else { return };
        assert!(reopened.is_active(at));
        let read: Vec<Event> = reopened
            .active_events(at)
            .map(|it| it.cloned().collect())
            .unwrap_or_default();
        assert_eq!(read, events);
        assert!(matches!(reopened.nearest_snapshot(at), Ok(Some(_))));
    }
}
