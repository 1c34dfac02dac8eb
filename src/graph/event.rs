//! Transactions as canonical undirected edges

use std::fmt;
use std::sync::Arc;

use super::TrackerError;

/// Absolute time in seconds since the Unix epoch
pub type Timestamp = i64;

/// Unordered actor pair stored as `(a, b)` with `a <= b`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    a: Arc<str>,
    b: Arc<str>,
}

impl Edge {
    /// Canonicalize two endpoints; direction is discarded
    pub fn new(first: impl Into<Arc<str>>, second: impl Into<Arc<str>>) -> Self {
        let (first, second) = (first.into(), second.into());
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }

    /// Lexicographically smaller endpoint
    pub fn actor_a(&self) -> &Arc<str> {
        &self.a
    }

    /// Lexicographically larger endpoint
    pub fn actor_b(&self) -> &Arc<str> {
        &self.b
    }

    /// True for a self-transaction
    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }

    /// Distinct endpoints, smaller first
    ///
    /// A loop yields its single actor once.
    pub fn actors(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        std::iter::once(&self.a).chain((!self.is_loop()).then_some(&self.b))
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// Validated, canonical transaction
///
/// Ordered by `(timestamp, actor_a, actor_b)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Event {
    timestamp: Timestamp,
    edge: Edge,
}

impl Event {
    /// Build an event from a raw actor/target pair
    ///
    /// Rejects empty or whitespace-only names. Names are stored verbatim,
    /// so `"A "` and `"A"` are different actors. `actor == target` is a
    /// valid self-transaction.
    pub fn new(timestamp: Timestamp, actor: &str, target: &str) -> Result<Self, TrackerError> {
        if actor.trim().is_empty() || target.trim().is_empty() {
            return Err(TrackerError::InvalidEvent("empty actor name".into()));
        }

        Ok(Self {
            timestamp,
            edge: Edge::new(actor, target),
        })
    }

    /// Reuse an existing edge at a different time
    pub(crate) fn at(timestamp: Timestamp, edge: Edge) -> Self {
        Self { timestamp, edge }
    }

    /// Event time
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Canonical actor pair
    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    /// Smaller endpoint
    pub fn actor_a(&self) -> &str {
        &self.edge.a
    }

    /// Larger endpoint
    pub fn actor_b(&self) -> &str {
        &self.edge.b
    }
}
