//! Pairing Heap implementation
//!
//! A pairing heap is a heap-ordered multi-way tree with:
//! - O(1) insert and merge
//! - O(log n) amortized delete_min
//!
//! Nodes can have any number of children; the children of a node form a
//! singly-linked list via sibling pointers. Insert and merge just compare
//! roots and link, which makes [`SequentialHeap::merge_steal`] a constant
//! time pointer splice — the best possible fit for a slot heap that gets
//! bulk-merged by the concurrent layer.
//!
//! Delete-min removes the root and rebuilds with the classic two-pass
//! pairing strategy: pair up adjacent children left to right, then fold the
//! pairs right to left. The two passes are what make the amortized bound
//! logarithmic; a single left-to-right fold would degenerate.
//!
//! # Key Invariants
//!
//! 1. **Heap property**: for any node, `node.item <= child.item`
//! 2. **Tree structure**: each node is linked into at most one child list
//! 3. **Root tracking**: the minimum element is always at the root

use crate::traits::SequentialHeap;
use std::ptr::NonNull;

struct Node<T> {
    item: T,
    /// First child in the child list. None if this node is a leaf.
    child: Option<NonNull<Node<T>>>,
    /// Next sibling in the parent's child list. None if last.
    sibling: Option<NonNull<Node<T>>>,
}

/// Pairing heap
///
/// # Example
///
/// ```rust
/// use mergeable_pq::{PairingHeap, SequentialHeap};
///
/// let mut heap = PairingHeap::new();
/// heap.insert(5);
/// heap.insert(1);
/// assert_eq!(heap.delete_min(), Some(1));
/// assert_eq!(heap.delete_min(), Some(5));
/// assert_eq!(heap.delete_min(), None);
/// ```
pub struct PairingHeap<T: Ord> {
    root: Option<NonNull<Node<T>>>,
    len: usize,
}

impl<T: Ord> SequentialHeap for PairingHeap<T> {
    type Item = T;

    fn new() -> Self {
        PairingHeap { root: None, len: 0 }
    }

    fn insert(&mut self, item: T) {
        let node = Box::into_raw(Box::new(Node {
            item,
            child: None,
            sibling: None,
        }));
        let node = unsafe { NonNull::new_unchecked(node) };
        self.root = Some(match self.root {
            Some(root) => unsafe { Self::link(root, node) },
            None => node,
        });
        self.len += 1;
    }

    fn delete_min(&mut self) -> Option<T> {
        let root = self.root.take()?;
        unsafe {
            let node = Box::from_raw(root.as_ptr());
            if let Some(first_child) = node.child {
                self.root = Some(Self::merge_pairs(first_child));
            }
            self.len -= 1;
            Some(node.item)
        }
    }

    fn peek_min(&self) -> Option<&T> {
        self.root.map(|root| unsafe { &(*root.as_ptr()).item })
    }

    /// Absorbs `other` in O(1): compare roots, link the larger under the
    /// smaller.
    fn merge_steal(&mut self, other: &mut Self) {
        let Some(other_root) = other.root.take() else {
            return;
        };
        self.root = Some(match self.root {
            Some(root) => unsafe { Self::link(root, other_root) },
            None => other_root,
        });
        self.len += std::mem::replace(&mut other.len, 0);
    }

    fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<T: Ord> PairingHeap<T> {
    /// Links two heap-ordered trees, returning the root with the smaller
    /// item. The loser becomes the winner's first child.
    unsafe fn link(a: NonNull<Node<T>>, b: NonNull<Node<T>>) -> NonNull<Node<T>> {
        let (winner, loser) = if (*b.as_ptr()).item < (*a.as_ptr()).item {
            (b, a)
        } else {
            (a, b)
        };
        (*loser.as_ptr()).sibling = (*winner.as_ptr()).child;
        (*winner.as_ptr()).child = Some(loser);
        winner
    }

    /// Two-pass pairing over a child list.
    ///
    /// First pass pairs and links adjacent children left to right, halving
    /// the number of trees. Second pass folds the survivors right to left
    /// into a single tree.
    unsafe fn merge_pairs(first: NonNull<Node<T>>) -> NonNull<Node<T>> {
        let mut pairs = Vec::new();
        let mut current = Some(first);
        while let Some(node) = current {
            let sibling = (*node.as_ptr()).sibling.take();
            match sibling {
                Some(sib) => {
                    current = (*sib.as_ptr()).sibling.take();
                    pairs.push(Self::link(node, sib));
                }
                None => {
                    pairs.push(node);
                    current = None;
                }
            }
        }
        let mut result = pairs.pop().expect("child list is non-empty");
        while let Some(pair) = pairs.pop() {
            result = Self::link(pair, result);
        }
        result
    }
}

impl<T: Ord> Default for PairingHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> Drop for PairingHeap<T> {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        if let Some(root) = self.root.take() {
            pending.push(root);
        }
        while let Some(node) = pending.pop() {
            unsafe {
                let node = Box::from_raw(node.as_ptr());
                if let Some(child) = node.child {
                    pending.push(child);
                }
                if let Some(sibling) = node.sibling {
                    pending.push(sibling);
                }
            }
        }
    }
}

unsafe impl<T: Ord + Send> Send for PairingHeap<T> {}
