//! # Rolling Median Degree over a Sliding Window
//!
//! Consumes a stream of timestamped transactions between two actors and,
//! after each one, reports the median number of distinct counterparties
//! per actor over the trailing window (60 seconds by default).
//!
//! ## Core Structures
//!
//! 1. **Order-statistic treap** ([`tree::OrderedTree`]): split/merge
//!    treap with subtree sizes; insert, remove and rank lookup in
//!    expected O(log n)
//! 2. **Windowed tracker** ([`graph::WindowedDegreeTracker`]): active
//!    events, last-seen edge times and per-actor degrees, with the treap
//!    keyed by `(degree, actor)` answering the median
//! 3. **Ingestion** ([`ingest`]): JSON records in, formatted medians out
//!
//! ## Usage Example
//!
//! ```
//! use median_degree::{TrackerConfig, WindowedDegreeTracker};
//!
//! let mut tracker = WindowedDegreeTracker::new(TrackerConfig::default())?;
//! tracker.insert_raw(0, "alice", "bob")?;
//! tracker.insert_raw(5, "bob", "carol")?;
//! assert_eq!(tracker.median_degree()?, 1.0);
//! # Ok::<(), median_degree::graph::TrackerError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod graph;  // Windowed degree tracking
pub mod ingest; // Record parsing and output
pub mod tree;   // Order-statistic treap

// Re-exports for convenience
pub use graph::{Edge, Event, InsertOutcome, Timestamp, TrackerError, WindowedDegreeTracker};
pub use tree::{OrderedTree, TreeError};

use thiserror::Error;

/// Default window length in seconds
pub const DEFAULT_WINDOW: Timestamp = 60;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Window length; events `window` or more behind the newest are dropped
    pub window: Timestamp,

    /// Seed for treap priorities (`None` = OS entropy)
    ///
    /// Medians never depend on it; it only fixes tree shapes for replay.
    pub seed: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            seed: None,
        }
    }
}

impl TrackerConfig {
    /// Override the window length
    pub fn with_window(mut self, window: Timestamp) -> Self {
        self.window = window;
        self
    }

    /// Fix the priority seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject unusable settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window <= 0 {
            return Err(ConfigError::InvalidWindow(self.window));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Window must be positive
    #[error("window must be positive, got {0}")]
    InvalidWindow(Timestamp),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_sixty_seconds() {
        let config = TrackerConfig::default();
        assert_eq!(config.window, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_positive_window_is_rejected() {
        let config = TrackerConfig::default().with_window(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindow(0)));
        assert!(matches!(
            WindowedDegreeTracker::new(config),
            Err(TrackerError::Config(ConfigError::InvalidWindow(0)))
        ));
    }
}
