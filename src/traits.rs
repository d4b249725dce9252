//! Common traits and result types for the queue family
//!
//! This module defines the plug-in contract for the sequential priority
//! queue stored in each bag slot, plus the outcome enumeration returned by
//! [`PriorityQueue::merge`](crate::PriorityQueue::merge).

/// Contract for the single-threaded priority queue stored in one bag slot.
///
/// The concurrent queue never touches a `SequentialHeap` without holding
/// the owning slot's lock, so implementations are free to be entirely
/// single-threaded. Any structure supporting the five operations below can
/// be plugged in; the crate bundles [`SkewHeap`](crate::skew::SkewHeap)
/// (the default), [`PairingHeap`](crate::pairing::PairingHeap), and a
/// [`std::collections::BinaryHeap`] adapter.
///
/// `merge_steal` is the operation that makes cross-queue merging cheap: it
/// must absorb the other heap's entire contents and leave it empty, and
/// should do so in better than element-by-element time where the structure
/// allows (O(1) for pairing heaps, O(log n) amortized for skew heaps).
pub trait SequentialHeap {
    /// Element type. The queue is a min-queue over this ordering.
    type Item: Ord;

    /// Creates an empty heap.
    fn new() -> Self;

    /// Inserts an element.
    fn insert(&mut self, item: Self::Item);

    /// Removes and returns the minimum element, or `None` if empty.
    fn delete_min(&mut self) -> Option<Self::Item>;

    /// Returns the minimum element without removing it.
    fn peek_min(&self) -> Option<&Self::Item>;

    /// Absorbs the entire contents of `other`, leaving it empty.
    fn merge_steal(&mut self, other: &mut Self);

    /// Returns `true` if the heap holds no elements.
    fn is_empty(&self) -> bool;

    /// Returns the number of elements held.
    fn len(&self) -> usize;
}

/// Outcome of [`PriorityQueue::merge`](crate::PriorityQueue::merge).
///
/// Merging never panics and never partially applies: the non-`Success`
/// outcomes leave both queues exactly as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// The two queues were distinct and are now one. Every subsequent
    /// operation on either handle sees the union.
    Success,
    /// The two handles already referred to the same queue. Benign.
    WereAlreadyEqual,
    /// The caller violated the unique-id contract: two simultaneously
    /// live queues share an id. No mutation occurred.
    IdClash,
    /// The queues have different widths and cannot be merged. No
    /// mutation occurred.
    Incompatible,
}
