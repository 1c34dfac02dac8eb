//! Treap node and the link-level split/merge primitives
//!
//! A link is `Option<Box<TreeNode>>`: every node is owned by exactly one
//! parent link or by the tree root. Split and merge consume links and hand
//! back new ones, so whole subtrees change owner without copying.
//!
//! Nothing here recurses. A treap with adversarial priorities degrades to
//! a path, and a recursive walk over a few hundred thousand nodes would
//! exhaust the thread stack. Split and merge detach the nodes they visit
//! onto a spine and re-link it bottom-up; teardown and height use an
//! explicit stack.

use std::cmp::Ordering;
use std::fmt;

/// Owning edge to a subtree (`None` = empty subtree)
pub(crate) type Link<K, V> = Option<Box<TreeNode<K, V>>>;

/// Single treap node, augmented with its subtree size
pub struct TreeNode<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// Heap priority; only consulted by merge
    pub(crate) priority: u64,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
    /// Nodes in this subtree, including this one
    pub(crate) size: usize,
}

impl<K, V> TreeNode<K, V> {
    /// Create a detached leaf
    pub(crate) fn leaf(key: K, value: V, priority: u64) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            priority,
            left: None,
            right: None,
            size: 1,
        })
    }

    /// Key stored at this node
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Payload stored at this node
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Size of the subtree rooted here
    pub fn subtree_size(&self) -> usize {
        self.size
    }

    /// Recompute `size` from the children
    ///
    /// Must run on every node whose child links were reassigned.
    #[inline]
    pub(crate) fn update(&mut self) {
        self.size = 1 + size(&self.left) + size(&self.right);
    }
}

// Children are summarized by size only; printing them would walk the
// whole subtree.
impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TreeNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("priority", &self.priority)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Size of a possibly empty subtree
#[inline]
pub(crate) fn size<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

/// Which child slot of a spine node receives the subtree built below it
#[derive(Debug, Clone, Copy)]
enum Slot {
    Left,
    Right,
}

/// Join two subtrees where every key of `left` precedes every key of `right`
///
/// The root with the higher priority wins; the loser is merged into the
/// winner's inner child slot.
pub(crate) fn merge<K, V>(left: Link<K, V>, right: Link<K, V>) -> Link<K, V> {
    let mut spine: Vec<(Box<TreeNode<K, V>>, Slot)> = Vec::new();
    let (mut left, mut right) = (left, right);

    let mut joined = loop {
        match (left, right) {
            (None, rest) | (rest, None) => break rest,
            (Some(mut l), Some(mut r)) => {
                if l.priority < r.priority {
                    right = r.left.take();
                    left = Some(l);
                    spine.push((r, Slot::Left));
                } else {
                    left = l.right.take();
                    right = Some(r);
                    spine.push((l, Slot::Right));
                }
            }
        }
    };

    while let Some((mut node, slot)) = spine.pop() {
        match slot {
            Slot::Left => node.left = joined,
            Slot::Right => node.right = joined,
        }
        node.update();
        joined = Some(node);
    }
    joined
}

/// Partition a subtree by `key`
///
/// Returns `(lower, upper)` where `lower` holds keys `<= key` when
/// `inclusive`, else keys `< key`.
pub(crate) fn split<K: Ord, V>(link: Link<K, V>, key: &K, inclusive: bool) -> (Link<K, V>, Link<K, V>) {
    // Each lower node adopts the next lower node as its right child; each
    // upper node adopts the next upper node as its left child.
    let mut lower_spine = Vec::new();
    let mut upper_spine = Vec::new();

    let mut link = link;
    while let Some(mut node) = link {
        let goes_left = match node.key.cmp(key) {
            Ordering::Less => true,
            Ordering::Equal => inclusive,
            Ordering::Greater => false,
        };
        if goes_left {
            link = node.right.take();
            lower_spine.push(node);
        } else {
            link = node.left.take();
            upper_spine.push(node);
        }
    }

    let mut lower = None;
    while let Some(mut node) = lower_spine.pop() {
        node.right = lower;
        node.update();
        lower = Some(node);
    }
    let mut upper = None;
    while let Some(mut node) = upper_spine.pop() {
        node.left = upper;
        node.update();
        upper = Some(node);
    }
    (lower, upper)
}

/// Longest root-to-leaf path, counted in nodes
pub(crate) fn height<K, V>(link: &Link<K, V>) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(&TreeNode<K, V>, usize)> = link.as_deref().map(|n| (n, 1)).into_iter().collect();
    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        stack.extend(node.left.as_deref().map(|n| (n, depth + 1)));
        stack.extend(node.right.as_deref().map(|n| (n, depth + 1)));
    }
    deepest
}

/// Free a subtree without recursing once per level
pub(crate) fn dispose<K, V>(link: Link<K, V>) {
    let mut stack: Vec<Box<TreeNode<K, V>>> = link.into_iter().collect();
    while let Some(mut node) = stack.pop() {
        stack.extend(node.left.take());
        stack.extend(node.right.take());
    }
}
