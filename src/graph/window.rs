//! Time-ordered set of active transactions

use std::collections::BTreeSet;

use super::{Event, Timestamp};

/// Active events ordered by `(timestamp, actor_a, actor_b)`
#[derive(Debug, Default, Clone)]
pub struct ActiveEventSet {
    events: BTreeSet<Event>,
}

impl ActiveEventSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is active
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Oldest active event
    pub fn earliest(&self) -> Option<&Event> {
        self.events.first()
    }

    /// Newest active event
    pub fn latest(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Add an event; false if it was already present
    pub fn insert(&mut self, event: Event) -> bool {
        self.events.insert(event)
    }

    /// Swap `old` for `new` (timestamp refresh of one edge)
    pub fn replace(&mut self, old: &Event, new: Event) {
        self.events.remove(old);
        self.events.insert(new);
    }

    /// Pop the oldest event if it lies `window` or more behind `anchor`
    ///
    /// The age saturates, so a gap wider than `i64` counts as expired.
    pub fn pop_expired(&mut self, anchor: Timestamp, window: Timestamp) -> Option<Event> {
        let earliest = self.events.first()?;
        if anchor.saturating_sub(earliest.timestamp()) >= window {
            self.events.pop_first()
        } else {
            None
        }
    }

    /// Events in time order
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }
}
