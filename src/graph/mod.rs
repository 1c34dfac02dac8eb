//! Windowed transaction graph
//!
//! Keeps three views of the same sliding window in sync:
//! - the active events in time order ([`ActiveEventSet`])
//! - the last-seen time of every active edge
//! - per-actor degrees plus an order-statistic index over them ([`DegreeIndex`])
//!
//! [`WindowedDegreeTracker`] ties them together and answers the median
//! degree query in O(log n).

mod degree;
mod event;
mod tracker;
mod window;

pub use degree::{DegreeIndex, DegreeKey};
pub use event::{Edge, Event, Timestamp};
pub use tracker::WindowedDegreeTracker;
pub use window::ActiveEventSet;

use crate::tree::TreeError;
use crate::ConfigError;
use thiserror::Error;

/// What happened to an inserted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Edge was not active; both endpoint degrees went up
    NewEdge {
        /// Events evicted before the edge was added
        evicted: usize,
    },
    /// Edge was already active; only its timestamp may have moved
    Refreshed {
        /// Events evicted before the refresh
        evicted: usize,
    },
    /// Event lags the window's leading edge by `lag >= window`; ignored
    Rejected {
        /// Seconds behind the newest active event
        lag: Timestamp,
    },
}

impl InsertOutcome {
    /// Events evicted by this insert
    pub fn evicted(&self) -> usize {
        match *self {
            InsertOutcome::NewEdge { evicted } | InsertOutcome::Refreshed { evicted } => evicted,
            InsertOutcome::Rejected { .. } => 0,
        }
    }

    /// True when the window check turned the event away
    pub fn is_rejected(&self) -> bool {
        matches!(self, InsertOutcome::Rejected { .. })
    }
}

/// Errors raised by the tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Malformed transaction (empty actor or target name)
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Rejected tracker configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Order-statistic lookup failed; indicates a broken size invariant
    #[error("median index failure: {0}")]
    Internal(#[from] TreeError),

    /// The window set, edge map and degree index disagree
    #[error("tracker state inconsistent: {0}")]
    Inconsistent(String),
}
