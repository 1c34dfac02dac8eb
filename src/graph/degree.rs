//! Per-actor degrees and the median index over them

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use crate::tree::{OrderedTree, TreeError};

/// Median index key: degree first, then actor name
pub type DegreeKey = (u32, Arc<str>);

/// Degree map kept in lockstep with an order-statistic tree
///
/// The tree holds exactly one `(degree, actor)` entry per actor in the map.
/// Actors whose degree drops to zero are purged from both.
#[derive(Debug)]
pub struct DegreeIndex {
    degrees: HashMap<Arc<str>, u32>,
    ranked: OrderedTree<DegreeKey, ()>,
    rng: StdRng,
}

impl DegreeIndex {
    /// Create an empty index drawing tree priorities from `rng`
    pub fn new(rng: StdRng) -> Self {
        Self {
            degrees: HashMap::new(),
            ranked: OrderedTree::new(),
            rng,
        }
    }

    /// Actors with positive degree
    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    /// True when no actor has an active edge
    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    /// Current degree of `actor` (0 if unknown)
    pub fn degree_of(&self, actor: &str) -> u32 {
        self.degrees.get(actor).copied().unwrap_or(0)
    }

    /// Add one edge to `actor`, returning the new degree
    pub fn increment(&mut self, actor: &Arc<str>) -> u32 {
        let old = self.degree_of(actor);
        let new = old + 1;
        self.reposition(actor, old, new);
        new
    }

    /// Remove one edge from `actor`, returning the new degree
    ///
    /// Unknown actors stay unknown.
    pub fn decrement(&mut self, actor: &Arc<str>) -> u32 {
        let old = self.degree_of(actor);
        if old == 0 {
            return 0;
        }
        let new = old - 1;
        self.reposition(actor, old, new);
        new
    }

    fn reposition(&mut self, actor: &Arc<str>, old: u32, new: u32) {
        if old > 0 {
            self.ranked.remove(&(old, Arc::clone(actor)));
        }
        if new > 0 {
            let priority = self.rng.gen();
            self.ranked
                .insert_with_priority((new, Arc::clone(actor)), (), priority);
            self.degrees.insert(Arc::clone(actor), new);
        } else {
            self.degrees.remove(actor);
        }
    }

    /// Median degree; NaN when no actor is tracked
    pub fn median(&self) -> Result<f64, TreeError> {
        let n = self.ranked.len();
        if n == 0 {
            return Ok(f64::NAN);
        }
        let upper = self.degree_at(n / 2)?;
        if n % 2 == 1 {
            Ok(f64::from(upper))
        } else {
            let lower = self.degree_at(n / 2 - 1)?;
            Ok((f64::from(lower) + f64::from(upper)) / 2.0)
        }
    }

    fn degree_at(&self, rank: usize) -> Result<u32, TreeError> {
        self.ranked
            .order_statistic(rank)
            .map(|((degree, _), _)| *degree)
    }

    /// `(degree, actor)` pairs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &DegreeKey> + '_ {
        self.ranked.iter().map(|(key, _)| key)
    }

    /// Verify the map and the tree describe the same multiset
    pub fn check_consistency(&self) -> Result<(), String> {
        self.ranked
            .check_invariants()
            .map_err(|err| err.to_string())?;
        if self.ranked.len() != self.degrees.len() {
            return Err(format!(
                "median index holds {} entries for {} actors",
                self.ranked.len(),
                self.degrees.len()
            ));
        }
        for (actor, &degree) in &self.degrees {
            if degree == 0 {
                return Err(format!("{actor} kept at degree zero"));
            }
            if !self.ranked.contains(&(degree, Arc::clone(actor))) {
                return Err(format!("{actor} missing from median index at degree {degree}"));
            }
        }
        Ok(())
    }
}
