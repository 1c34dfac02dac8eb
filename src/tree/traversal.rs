//! In-order traversal
//!
//! Explicit stack of borrowed nodes, bounded by tree height.

use super::node::{Link, TreeNode};

/// In-order iterator over `(key, value)` pairs
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    stack: Vec<&'a TreeNode<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: &'a Link<K, V>) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: super::node::size(root),
        };
        iter.descend_left(root);
        iter
    }

    /// Push `link` and its chain of left children
    fn descend_left(&mut self, mut link: &'a Link<K, V>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.descend_left(&node.right);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
