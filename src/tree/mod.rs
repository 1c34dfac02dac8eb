//! Order-statistic treap
//!
//! A binary search tree over `K: Ord` whose shape is kept balanced in
//! expectation by independent random priorities. There are no rotations:
//! every mutation is a split followed by merges, and each node carries the
//! size of its subtree so rank queries run in O(height).
//!
//! Expected height is O(log n). Worst case is O(n) for an unlucky (or
//! injected) priority sequence; no operation recurses per level, so that
//! shape costs time but never stack.

mod node;
mod traversal;

pub use node::TreeNode;
pub use traversal::Iter;

use node::{size, Link};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors raised by [`OrderedTree`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Rank outside `0..len`
    #[error("rank {rank} out of range for tree of size {len}")]
    IndexOutOfRange {
        /// Requested rank
        rank: usize,
        /// Tree size at the time of the request
        len: usize,
    },

    /// Merge operands whose key ranges interleave
    #[error("cannot merge trees with overlapping key ranges")]
    OverlappingRanges,

    /// Structural invariant broken (size, order or heap)
    #[error("tree invariant violated: {0}")]
    InvariantViolated(String),
}

/// Treap keyed by `K`, augmented with subtree sizes
pub struct OrderedTree<K, V> {
    root: Link<K, V>,
}

impl<K, V> Drop for OrderedTree<K, V> {
    fn drop(&mut self) {
        node::dispose(self.root.take());
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for OrderedTree<K, V> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<K, V> OrderedTree<K, V> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, O(1)
    #[inline]
    pub fn len(&self) -> usize {
        size(&self.root)
    }

    /// True when the tree holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        node::dispose(self.root.take());
    }

    /// Longest root-to-leaf path (0 for an empty tree)
    pub fn height(&self) -> usize {
        node::height(&self.root)
    }

    /// In-order iterator over entries
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root)
    }

    /// Smallest entry
    pub fn first(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some((&node.key, &node.value))
    }

    /// Largest entry
    pub fn last(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some((&node.key, &node.value))
    }

    /// Entry at 0-based in-order position `rank`
    ///
    /// Descends from the root, steering by left-subtree sizes.
    pub fn order_statistic(&self, rank: usize) -> Result<(&K, &V), TreeError> {
        let len = self.len();
        if rank >= len {
            return Err(TreeError::IndexOutOfRange { rank, len });
        }

        let mut remaining = rank;
        let mut link = &self.root;
        while let Some(node) = link {
            let left = size(&node.left);
            match remaining.cmp(&left) {
                Ordering::Less => link = &node.left,
                Ordering::Equal => return Ok((&node.key, &node.value)),
                Ordering::Greater => {
                    remaining -= left + 1;
                    link = &node.right;
                }
            }
        }

        Err(TreeError::InvariantViolated(format!(
            "rank {rank} not reached although size is {len}"
        )))
    }
}

impl<K: Ord, V> OrderedTree<K, V> {
    /// Insert `key` with a random priority
    ///
    /// Returns the previous value if `key` was already present; the size
    /// is then unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_with_priority(key, value, rand::random())
    }

    /// Insert `key` with an explicit priority
    pub fn insert_with_priority(&mut self, key: K, value: V, priority: u64) -> Option<V> {
        let (lower, upper) = node::split(self.root.take(), &key, true);
        let (lower, existing) = node::split(lower, &key, false);
        let previous = existing.map(|node| node.value);

        let leaf = TreeNode::leaf(key, value, priority);
        self.root = node::merge(node::merge(lower, Some(leaf)), upper);
        previous
    }

    /// Remove `key`, returning its value
    ///
    /// An absent key leaves the tree untouched and yields `None`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (lower, upper) = node::split(self.root.take(), key, true);
        let (lower, removed) = node::split(lower, key, false);
        self.root = node::merge(lower, upper);
        removed.map(|node| node.value)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut link = &self.root;
        while let Some(node) = link {
            match key.cmp(&node.key) {
                Ordering::Less => link = &node.left,
                Ordering::Equal => return Some(&node.value),
                Ordering::Greater => link = &node.right,
            }
        }
        None
    }

    /// True when `key` is present
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of keys strictly less than `key`
    pub fn rank_of(&self, key: &K) -> usize {
        let mut rank = 0;
        let mut link = &self.root;
        while let Some(node) = link {
            if node.key < *key {
                rank += size(&node.left) + 1;
                link = &node.right;
            } else {
                link = &node.left;
            }
        }
        rank
    }

    /// Append `other` onto this tree, leaving `other` empty
    ///
    /// Every key of `self` must be smaller than every key of `other`;
    /// otherwise both trees are left as they were.
    pub fn merge(&mut self, other: &mut Self) -> Result<(), TreeError> {
        if let (Some((max, _)), Some((min, _))) = (self.last(), other.first()) {
            if max >= min {
                return Err(TreeError::OverlappingRanges);
            }
        }
        self.root = node::merge(self.root.take(), other.root.take());
        Ok(())
    }

    /// Cut off the upper part of the tree
    ///
    /// `self` keeps keys `<= key` (`inclusive`) or `< key`; the rest is
    /// returned as a new tree.
    pub fn split(&mut self, key: &K, inclusive: bool) -> Self {
        let (lower, upper) = node::split(self.root.take(), key, inclusive);
        self.root = lower;
        Self { root: upper }
    }

    /// Validate size augmentation, strict key order and heap order
    ///
    /// Sizes and priorities are checked node by node against the children;
    /// key order is checked on the in-order sequence.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let mut stack: Vec<&TreeNode<K, V>> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            let expected = 1 + size(&node.left) + size(&node.right);
            if node.size != expected {
                return Err(TreeError::InvariantViolated(format!(
                    "stored size {} but children imply {expected}",
                    node.size
                )));
            }
            for child in [node.left.as_deref(), node.right.as_deref()].into_iter().flatten() {
                if child.priority > node.priority {
                    return Err(TreeError::InvariantViolated(format!(
                        "child priority {} above parent priority {}",
                        child.priority, node.priority
                    )));
                }
                stack.push(child);
            }
        }

        let mut keys = self.iter().map(|(key, _)| key);
        if let Some(mut previous) = keys.next() {
            for key in keys {
                if key <= previous {
                    return Err(TreeError::InvariantViolated("keys out of order".into()));
                }
                previous = key;
            }
        }
        Ok(())
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord, V> Extend<(K, V)> for OrderedTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for OrderedTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<K: Copy, V>(tree: &OrderedTree<K, V>) -> Vec<K> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn insert_remove_two_hundred() {
        let mut tree: OrderedTree<i32, i32> = (1..=200).map(|i| (i, i)).collect();
        assert_eq!(tree.len(), 200);

        assert_eq!(tree.remove(&10), Some(10));
        assert_eq!(tree.len(), 199);
        assert!(!tree.contains(&10));
        assert_eq!(tree.remove(&10), None);
        assert_eq!(tree.len(), 199);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn duplicate_insert_replaces_value() {
        let mut tree = OrderedTree::new();
        assert_eq!(tree.insert("a", 1), None);
        assert_eq!(tree.insert("a", 2), Some(1));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&"a"), Some(&2));
    }

    #[test]
    fn order_statistic_walks_ranks() {
        let tree: OrderedTree<u32, ()> = [40, 10, 30, 20, 50].into_iter().map(|k| (k, ())).collect();
        for (rank, expected) in [10, 20, 30, 40, 50].into_iter().enumerate() {
            assert_eq!(tree.order_statistic(rank).unwrap().0, &expected);
            assert_eq!(tree.rank_of(&expected), rank);
        }
        assert_eq!(
            tree.order_statistic(5),
            Err(TreeError::IndexOutOfRange { rank: 5, len: 5 })
        );
    }

    #[test]
    fn order_statistic_on_empty_tree_is_out_of_range() {
        let tree: OrderedTree<u32, ()> = OrderedTree::new();
        assert!(matches!(
            tree.order_statistic(0),
            Err(TreeError::IndexOutOfRange { rank: 0, len: 0 })
        ));
    }

    #[test]
    fn split_then_merge_restores_sequence() {
        let mut tree: OrderedTree<u32, ()> = (0..64).map(|k| (k, ())).collect();
        let mut upper = tree.split(&31, true);
        assert_eq!(tree.len(), 32);
        assert_eq!(upper.len(), 32);
        assert_eq!(tree.last().map(|(k, _)| *k), Some(31));
        assert_eq!(upper.first().map(|(k, _)| *k), Some(32));

        tree.merge(&mut upper).unwrap();
        assert!(upper.is_empty());
        assert_eq!(keys(&tree), (0..64).collect::<Vec<_>>());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn exclusive_split_moves_boundary_key_up() {
        let mut tree: OrderedTree<u32, ()> = (0..10).map(|k| (k, ())).collect();
        let upper = tree.split(&5, false);
        assert_eq!(keys(&tree), vec![0, 1, 2, 3, 4]);
        assert_eq!(keys(&upper), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn overlapping_merge_is_refused() {
        let mut low: OrderedTree<u32, ()> = [1, 5].into_iter().map(|k| (k, ())).collect();
        let mut high: OrderedTree<u32, ()> = [3, 9].into_iter().map(|k| (k, ())).collect();
        assert_eq!(low.merge(&mut high), Err(TreeError::OverlappingRanges));
        assert_eq!(keys(&low), vec![1, 5]);
        assert_eq!(keys(&high), vec![3, 9]);
    }

    #[test]
    fn merge_with_empty_sides() {
        let mut tree: OrderedTree<u32, ()> = OrderedTree::new();
        let mut other: OrderedTree<u32, ()> = [1, 2].into_iter().map(|k| (k, ())).collect();
        tree.merge(&mut other).unwrap();
        assert_eq!(keys(&tree), vec![1, 2]);

        let mut empty = OrderedTree::new();
        tree.merge(&mut empty).unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn random_priorities_keep_height_small() {
        let tree: OrderedTree<u32, ()> = (0..4096).map(|k| (k, ())).collect();
        // 2 * ln(4096) is about 17; leave generous slack.
        assert!(tree.height() < 60, "height {}", tree.height());
    }

    #[test]
    fn clear_empties_a_degenerate_tree() {
        let mut tree = OrderedTree::new();
        for k in 0..200_000u32 {
            tree.insert_with_priority(k, (), u64::from(k));
        }
        assert_eq!(tree.height(), 200_000);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
    }

    #[test]
    fn check_invariants_spots_heap_violation() {
        let mut tree = OrderedTree::new();
        tree.insert_with_priority(1u32, (), 10);
        tree.insert_with_priority(2u32, (), 5);
        if let Some(root) = tree.root.as_mut() {
            root.priority = 1;
        }
        assert!(matches!(
            tree.check_invariants(),
            Err(TreeError::InvariantViolated(_))
        ));
    }

    #[test]
    fn check_invariants_spots_bad_size() {
        let mut tree: OrderedTree<u32, ()> = (0..8).map(|k| (k, ())).collect();
        if let Some(root) = tree.root.as_mut() {
            root.size += 1;
        }
        assert!(matches!(
            tree.check_invariants(),
            Err(TreeError::InvariantViolated(_))
        ));
    }
}
