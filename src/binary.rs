//! Standard-library binary heap adapter
//!
//! Wraps [`std::collections::BinaryHeap`] (a max-heap) behind
//! [`SequentialHeap`]'s min-queue contract using [`Reverse`]. Provided as
//! the zero-surprise baseline plug-in: no unsafe, no amortized subtleties,
//! O(n) `merge_steal`. Prefer [`SkewHeap`](crate::skew::SkewHeap) or
//! [`PairingHeap`](crate::pairing::PairingHeap) when merges dominate.

use crate::traits::SequentialHeap;
use std::cmp::Reverse;

/// Min-queue adapter over `std::collections::BinaryHeap`.
#[derive(Debug)]
pub struct StdBinaryHeap<T: Ord> {
    data: std::collections::BinaryHeap<Reverse<T>>,
}

impl<T: Ord> SequentialHeap for StdBinaryHeap<T> {
    type Item = T;

    fn new() -> Self {
        StdBinaryHeap {
            data: std::collections::BinaryHeap::new(),
        }
    }

    fn insert(&mut self, item: T) {
        self.data.push(Reverse(item));
    }

    fn delete_min(&mut self) -> Option<T> {
        self.data.pop().map(|Reverse(item)| item)
    }

    fn peek_min(&self) -> Option<&T> {
        self.data.peek().map(|Reverse(item)| item)
    }

    fn merge_steal(&mut self, other: &mut Self) {
        self.data.append(&mut other.data);
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

impl<T: Ord> Default for StdBinaryHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}
