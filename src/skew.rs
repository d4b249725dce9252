//! Skew Heap implementation
//!
//! A skew heap is a self-adjusting heap-ordered binary tree in which every
//! operation is expressed through a single `meld`:
//!
//! - **Insert**: meld with a singleton — O(log n) amortized
//! - **Delete-min**: meld the root's two subtrees — O(log n) amortized
//! - **Merge**: one meld — O(log n) amortized
//!
//! Meld walks the right spines of both trees, always descending into the
//! tree with the larger root, and unconditionally swaps the children of
//! every node it visits on the way back up. That unconditional swap is the
//! entire balancing scheme: it keeps right spines short in the amortized
//! sense without storing any rank or size information in the nodes.
//!
//! The cheap structural merge is why this is the default slot heap for
//! [`PriorityQueue`](crate::PriorityQueue) — draining a pending-merge list
//! melds whole heaps rather than reinserting element by element.

use crate::traits::SequentialHeap;

struct Node<T> {
    item: T,
    left: Option<Box<Node<T>>>,
    right: Option<Box<Node<T>>>,
}

/// Skew heap
///
/// # Example
///
/// ```rust
/// use mergeable_pq::{SequentialHeap, SkewHeap};
///
/// let mut heap = SkewHeap::new();
/// heap.insert(5);
/// heap.insert(1);
/// heap.insert(3);
/// assert_eq!(heap.peek_min(), Some(&1));
/// assert_eq!(heap.delete_min(), Some(1));
/// assert_eq!(heap.delete_min(), Some(3));
/// ```
pub struct SkewHeap<T: Ord> {
    root: Option<Box<Node<T>>>,
    len: usize,
}

fn meld<T: Ord>(a: Option<Box<Node<T>>>, b: Option<Box<Node<T>>>) -> Option<Box<Node<T>>> {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) => {
            // keep the smaller root on top
            let (mut top, bottom) = if b.item < a.item { (b, a) } else { (a, b) };
            let melded = meld(top.right.take(), Some(bottom));
            // the unconditional child swap is what keeps the tree balanced
            top.right = top.left.take();
            top.left = melded;
            Some(top)
        }
    }
}

impl<T: Ord> SequentialHeap for SkewHeap<T> {
    type Item = T;

    fn new() -> Self {
        SkewHeap { root: None, len: 0 }
    }

    fn insert(&mut self, item: T) {
        let single = Some(Box::new(Node {
            item,
            left: None,
            right: None,
        }));
        self.root = meld(self.root.take(), single);
        self.len += 1;
    }

    fn delete_min(&mut self) -> Option<T> {
        let root = self.root.take()?;
        self.root = meld(root.left, root.right);
        self.len -= 1;
        Some(root.item)
    }

    fn peek_min(&self) -> Option<&T> {
        self.root.as_ref().map(|node| &node.item)
    }

    fn merge_steal(&mut self, other: &mut Self) {
        self.root = meld(self.root.take(), other.root.take());
        self.len += std::mem::replace(&mut other.len, 0);
    }

    fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<T: Ord> Default for SkewHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> Drop for SkewHeap<T> {
    fn drop(&mut self) {
        // iterative teardown; deep right spines would overflow the stack
        // under the default recursive Box drop
        let mut pending = Vec::new();
        if let Some(root) = self.root.take() {
            pending.push(root);
        }
        while let Some(mut node) = pending.pop() {
            if let Some(left) = node.left.take() {
                pending.push(left);
            }
            if let Some(right) = node.right.take() {
                pending.push(right);
            }
        }
    }
}
