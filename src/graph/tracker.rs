//! Sliding-window degree tracker
//!
//! One call to [`WindowedDegreeTracker::insert`] is one state transition:
//! window check, eviction, then the new edge. Nothing is mutated before
//! the window check passes, so a rejected event leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use super::{ActiveEventSet, DegreeIndex, DegreeKey, Edge, Event, InsertOutcome, Timestamp, TrackerError};
use crate::TrackerConfig;

/// Rolling median of actor degree over a trailing time window
#[derive(Debug)]
pub struct WindowedDegreeTracker {
    window: Timestamp,
    active: ActiveEventSet,
    last_seen: HashMap<Edge, Timestamp>,
    degrees: DegreeIndex,
}

impl WindowedDegreeTracker {
    /// Create an empty tracker
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            window: config.window,
            active: ActiveEventSet::new(),
            last_seen: HashMap::new(),
            degrees: DegreeIndex::new(rng),
        })
    }

    /// Window length in seconds
    pub fn window(&self) -> Timestamp {
        self.window
    }

    /// Validate a raw transaction and insert it
    pub fn insert_raw(
        &mut self,
        timestamp: Timestamp,
        actor: &str,
        target: &str,
    ) -> Result<InsertOutcome, TrackerError> {
        let event = Event::new(timestamp, actor, target)?;
        Ok(self.insert(event))
    }

    /// Apply one transaction
    pub fn insert(&mut self, event: Event) -> InsertOutcome {
        let timestamp = event.timestamp();
        let latest = self.latest_timestamp();

        if let Some(latest) = latest {
            let lag = latest.saturating_sub(timestamp);
            if lag >= self.window {
                debug!(timestamp, latest, lag, edge = %event.edge(), "rejecting out-of-window event");
                return InsertOutcome::Rejected { lag };
            }
        }

        let anchor = latest.map_or(timestamp, |latest| latest.max(timestamp));
        let evicted = self.evict(anchor);

        let previous = self.last_seen.get(event.edge()).copied();
        match previous {
            Some(previous) => {
                if timestamp > previous {
                    debug!(edge = %event.edge(), previous, timestamp, "refreshing edge");
                    let stale = Event::at(previous, event.edge().clone());
                    self.last_seen.insert(event.edge().clone(), timestamp);
                    self.active.replace(&stale, event);
                }
                InsertOutcome::Refreshed { evicted }
            }
            None => {
                for actor in event.edge().actors() {
                    self.degrees.increment(actor);
                }
                self.last_seen.insert(event.edge().clone(), timestamp);
                self.active.insert(event);
                InsertOutcome::NewEdge { evicted }
            }
        }
    }

    /// Drop every event `window` or more behind `anchor`
    fn evict(&mut self, anchor: Timestamp) -> usize {
        let mut evicted = 0;
        while let Some(expired) = self.active.pop_expired(anchor, self.window) {
            evicted += 1;
            let edge = expired.edge();
            let current = self.last_seen.get(edge) == Some(&expired.timestamp());
            debug_assert!(current, "window held a superseded entry for {edge}");
            if !current {
                continue;
            }

            self.last_seen.remove(edge);
            for actor in edge.actors() {
                self.degrees.decrement(actor);
            }
            trace!(%edge, timestamp = expired.timestamp(), "evicted edge");
        }
        evicted
    }

    /// Median degree over actors with an active edge
    ///
    /// NaN when nothing is active.
    pub fn median_degree(&self) -> Result<f64, TrackerError> {
        Ok(self.degrees.median()?)
    }

    /// Degree of `actor` within the current window
    pub fn degree_of(&self, actor: &str) -> u32 {
        self.degrees.degree_of(actor)
    }

    /// Number of actors with positive degree
    pub fn actors(&self) -> usize {
        self.degrees.len()
    }

    /// Number of distinct active edges
    pub fn active_edges(&self) -> usize {
        self.last_seen.len()
    }

    /// Timestamp at the leading edge of the window
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.active.latest().map(Event::timestamp)
    }

    /// Snapshot of `(degree, actor)` in ascending order
    pub fn degrees(&self) -> Vec<(u32, Arc<str>)> {
        self.degrees.iter().map(|(d, a)| (*d, Arc::clone(a))).collect()
    }

    /// `(degree, actor)` pairs in ascending order without copying
    pub fn iter_degrees(&self) -> impl Iterator<Item = &DegreeKey> + '_ {
        self.degrees.iter()
    }

    /// Cross-check the window set, the edge map and the degree index
    pub fn check_consistency(&self) -> Result<(), TrackerError> {
        let fail = |msg: String| -> Result<(), TrackerError> { Err(TrackerError::Inconsistent(msg)) };

        if self.active.len() != self.last_seen.len() {
            return fail(format!(
                "{} active events for {} edges",
                self.active.len(),
                self.last_seen.len()
            ));
        }

        let mut expected: HashMap<&str, u32> = HashMap::new();
        for event in self.active.iter() {
            if self.last_seen.get(event.edge()) != Some(&event.timestamp()) {
                return fail(format!("stale window entry for {}", event.edge()));
            }
            for actor in event.edge().actors() {
                *expected.entry(&**actor).or_default() += 1;
            }
        }

        if let (Some(first), Some(last)) = (self.active.earliest(), self.active.latest()) {
            if last.timestamp().saturating_sub(first.timestamp()) >= self.window {
                return fail(format!(
                    "window spans {}..{}",
                    first.timestamp(),
                    last.timestamp()
                ));
            }
        }

        if expected.len() != self.degrees.len() {
            return fail(format!(
                "{} actors on active edges but {} tracked",
                expected.len(),
                self.degrees.len()
            ));
        }
        for (actor, degree) in expected {
            if self.degrees.degree_of(actor) != degree {
                return fail(format!(
                    "{actor} has degree {} but {degree} active edges",
                    self.degrees.degree_of(actor)
                ));
            }
        }

        self.degrees
            .check_consistency()
            .map_err(TrackerError::Inconsistent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> WindowedDegreeTracker {
        WindowedDegreeTracker::new(TrackerConfig::default().with_seed(11)).unwrap()
    }

    #[test]
    fn first_event_gives_median_one() {
        let mut t = tracker();
        assert!(t.median_degree().unwrap().is_nan());
        assert_eq!(
            t.insert_raw(0, "A", "B").unwrap(),
            InsertOutcome::NewEdge { evicted: 0 }
        );
        assert_eq!(t.median_degree().unwrap(), 1.0);
        t.check_consistency().unwrap();
    }

    #[test]
    fn older_refresh_keeps_newer_timestamp() {
        let mut t = tracker();
        t.insert_raw(50, "A", "B").unwrap();
        assert_eq!(
            t.insert_raw(20, "B", "A").unwrap(),
            InsertOutcome::Refreshed { evicted: 0 }
        );
        // Edge must survive until 110, not 80.
        t.insert_raw(100, "C", "D").unwrap();
        assert_eq!(t.degree_of("A"), 1);
        t.check_consistency().unwrap();
    }

    #[test]
    fn refresh_postpones_eviction() {
        let mut t = tracker();
        t.insert_raw(0, "A", "B").unwrap();
        t.insert_raw(40, "A", "B").unwrap();
        assert_eq!(
            t.insert_raw(70, "C", "D").unwrap(),
            InsertOutcome::NewEdge { evicted: 0 }
        );
        assert_eq!(t.degree_of("A"), 1);
        assert_eq!(t.active_edges(), 2);

        assert_eq!(
            t.insert_raw(100, "C", "E").unwrap(),
            InsertOutcome::NewEdge { evicted: 1 }
        );
        assert_eq!(t.degree_of("A"), 0);
        assert_eq!(t.degree_of("C"), 2);
        t.check_consistency().unwrap();
    }

    #[test]
    fn invalid_event_changes_nothing() {
        let mut t = tracker();
        t.insert_raw(0, "A", "B").unwrap();
        assert!(matches!(
            t.insert_raw(100, "", "B"),
            Err(TrackerError::InvalidEvent(_))
        ));
        assert_eq!(t.latest_timestamp(), Some(0));
        assert_eq!(t.actors(), 2);
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let mut t = tracker();
        t.insert_raw(0, "A", "B").unwrap();
        t.insert_raw(59, "C", "D").unwrap();
        assert_eq!(t.active_edges(), 2);
        assert_eq!(
            t.insert_raw(60, "E", "F").unwrap(),
            InsertOutcome::NewEdge { evicted: 1 }
        );
        assert_eq!(t.active_edges(), 2);
        assert!(matches!(
            t.insert_raw(0, "G", "H").unwrap(),
            InsertOutcome::Rejected { lag: 60 }
        ));
    }

    #[test]
    fn self_transaction_counts_once() {
        let mut t = tracker();
        assert_eq!(
            t.insert_raw(0, "A", "A").unwrap(),
            InsertOutcome::NewEdge { evicted: 0 }
        );
        assert_eq!(t.degree_of("A"), 1);
        assert_eq!(t.median_degree().unwrap(), 1.0);

        t.insert_raw(1, "A", "B").unwrap();
        assert_eq!(t.degree_of("A"), 2);
        assert_eq!(t.median_degree().unwrap(), 1.5);
        t.check_consistency().unwrap();

        t.insert_raw(60, "C", "D").unwrap();
        assert_eq!(t.degree_of("A"), 1);
        t.insert_raw(61, "C", "E").unwrap();
        assert_eq!(t.degree_of("A"), 0);
        assert_eq!(t.actors(), 3);
        t.check_consistency().unwrap();
    }

    #[test]
    fn whitespace_variants_are_distinct_actors() {
        let mut t = tracker();
        t.insert_raw(0, "A ", "A").unwrap();
        assert_eq!(t.actors(), 2);
        assert_eq!(t.degree_of("A"), 1);
        assert_eq!(t.degree_of("A "), 1);
        t.check_consistency().unwrap();
    }

    #[test]
    fn far_past_timestamp_is_rejected_without_overflow() {
        let mut t = tracker();
        t.insert_raw(i64::MAX, "A", "B").unwrap();
        assert_eq!(
            t.insert_raw(i64::MIN, "C", "D").unwrap(),
            InsertOutcome::Rejected { lag: i64::MAX }
        );
        assert_eq!(t.active_edges(), 1);
        t.check_consistency().unwrap();
    }

    #[test]
    fn far_future_timestamp_evicts_without_overflow() {
        let mut t = tracker();
        t.insert_raw(i64::MIN, "A", "B").unwrap();
        assert_eq!(
            t.insert_raw(i64::MAX, "C", "D").unwrap(),
            InsertOutcome::NewEdge { evicted: 1 }
        );
        assert_eq!(t.degree_of("A"), 0);
        assert_eq!(t.latest_timestamp(), Some(i64::MAX));
        t.check_consistency().unwrap();
    }

    #[test]
    fn refreshes_keep_one_window_entry_per_edge() {
        let mut t = tracker();
        for ts in [0, 10, 5, 20, 20, 45, 30] {
            t.insert_raw(ts, "A", "B").unwrap();
            t.insert_raw(ts, "B", "C").unwrap();
            assert_eq!(t.active.len(), t.active_edges());
        }
        // Both edges were last seen at 45 and expire together.
        assert_eq!(
            t.insert_raw(105, "D", "E").unwrap(),
            InsertOutcome::NewEdge { evicted: 2 }
        );
        assert_eq!(t.active.len(), 1);
        t.check_consistency().unwrap();
    }
}
