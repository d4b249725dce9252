//! Handle chain: the union-find layer that gives merged queues one identity.
//!
//! Every queue starts as a single handle node owning a bag. Merging two
//! queues links the higher-id leaf to the lower-id leaf with one CAS of its
//! `next` pointer — that CAS is the linearization point of the union. The
//! condemned side's bag is then drained slot-by-slot into the survivor and
//! its `bag` pointer nulled, which is the linearization point of the
//! contents transfer. Readers walk `next` pointers to the current
//! representative, helping unfinished drains along the way.
//!
//! `next` pointers only ever advance to nodes with strictly smaller ids,
//! so chains are acyclic by construction and path compression (rewriting a
//! `next` to any later node of the same walk) can never violate the order.
//! The compression scheme is the same two-pass find used by atomic
//! union-find structures: locate the representative, then re-walk and CAS
//! every intermediate pointer forward.

use crate::arena::NodeArena;
use crate::bag::Bag;
use crate::sync::{AtomicPtr, Ordering};
use crate::traits::SequentialHeap;
use std::ptr;

pub(crate) struct HandleNode<S: SequentialHeap> {
    /// Unique among simultaneously live queues; clashes are a user error
    /// surfaced by `try_union`.
    id: usize,
    /// Owned bag. Nulled exactly once, after every slot has been pushed
    /// into the destination's pending-merge lists.
    bag: AtomicPtr<Bag<S>>,
    /// Next node in the chain, strictly smaller id. Set exactly once by a
    /// union, then only ever compressed further forward.
    next: AtomicPtr<HandleNode<S>>,
}

impl<S: SequentialHeap> HandleNode<S> {
    pub(crate) fn next_ptr(&self) -> &AtomicPtr<HandleNode<S>> {
        &self.next
    }
}

/// Outcome of the handle-level union attempt.
pub(crate) enum UnionOutcome<S: SequentialHeap> {
    /// The union CAS succeeded; `src` is the condemned endpoint whose bag
    /// must now be drained into `dst`.
    Merged {
        src: *mut HandleNode<S>,
        dst: *mut HandleNode<S>,
    },
    /// Both handles already descend to the same node.
    AlreadyEqual,
    /// Two distinct live queues share an id.
    IdClash,
}

/// Allocates a handle node and its bag of `width` empty slots.
pub(crate) fn make_handle<S: SequentialHeap, A: NodeArena>(
    arena: &A,
    id: usize,
    width: usize,
) -> *mut HandleNode<S> {
    let handle = arena
        .alloc(HandleNode {
            id,
            bag: AtomicPtr::new(ptr::null_mut()),
            next: AtomicPtr::new(ptr::null_mut()),
        })
        .as_ptr();
    let bag = unsafe { Bag::new_in(arena, width, handle) };
    unsafe { &*handle }.bag.store(bag, Ordering::Release);
    handle
}

/// Walks `next` pointers from `start` to the first node still holding a
/// bag, compressing the path behind it.
///
/// # Safety
///
/// `start` must point to a live handle node from this queue family's
/// arena.
pub(crate) unsafe fn find_closest_bag<S: SequentialHeap>(
    start: *mut HandleNode<S>,
) -> (*mut HandleNode<S>, *mut Bag<S>) {
    let mut cur = start;
    loop {
        let bag = (*cur).bag.load(Ordering::Acquire);
        if !bag.is_null() {
            compress_path(start, cur);
            return (cur, bag);
        }
        let next = (*cur).next.load(Ordering::Acquire);
        debug_assert!(!next.is_null(), "bagless handle node must name a successor");
        cur = next;
    }
}

/// Like [`find_closest_bag`], but linearizes every pending merge found on
/// the way down, so the caller's view includes all contents merged into it.
///
/// # Safety
///
/// As for [`find_closest_bag`].
pub(crate) unsafe fn descend_merging<S: SequentialHeap>(
    start: *mut HandleNode<S>,
) -> (*mut HandleNode<S>, *mut Bag<S>) {
    let mut cur = start;
    loop {
        let next = (*cur).next.load(Ordering::Acquire);
        if next.is_null() {
            let bag = (*cur).bag.load(Ordering::Acquire);
            if bag.is_null() {
                // merged away between the two loads; next is non-null now
                continue;
            }
            compress_path(start, cur);
            return (cur, bag);
        }
        ensure_merged_into(cur, next);
        cur = next;
    }
}

/// Linearizes the merge a slot node was routed by: if the handle has been
/// unioned into a successor, drives the bag drain to its `bag = null`
/// linearization point.
///
/// # Safety
///
/// `node` must point to a live handle node.
pub(crate) unsafe fn ensure_merged<S: SequentialHeap>(node: *const HandleNode<S>) {
    let node = node as *mut HandleNode<S>;
    let next = (*node).next.load(Ordering::Acquire);
    if !next.is_null() {
        ensure_merged_into(node, next);
    }
}

/// Pushes every slot of `node`'s bag into `dest`'s pending-merge lists and
/// then publishes the transfer by nulling `bag`. Idempotent and safe to
/// race: any number of helpers may run this concurrently.
///
/// # Safety
///
/// Both pointers must be live handle nodes of equal width.
pub(crate) unsafe fn ensure_merged_into<S: SequentialHeap>(
    node: *mut HandleNode<S>,
    dest: *mut HandleNode<S>,
) {
    let bag = (*node).bag.load(Ordering::Acquire);
    if bag.is_null() {
        return;
    }
    (*bag).merge_per_element_into(dest);
    // the linearization point of the handle-level merge
    let _ = (*node)
        .bag
        .compare_exchange(bag, ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire);
}

/// Attempts to union the queues behind `a` and `b`.
///
/// Returns [`UnionOutcome::Merged`] with the chosen direction (always
/// higher id into lower id) once this thread's CAS wins; loops internally
/// while other merges land first.
///
/// # Safety
///
/// Both pointers must be live handle nodes of equal width.
pub(crate) unsafe fn try_union<S: SequentialHeap>(
    a: *mut HandleNode<S>,
    b: *mut HandleNode<S>,
) -> UnionOutcome<S> {
    let (mut a_leaf, _) = descend_merging(a);
    let (mut b_leaf, _) = descend_merging(b);
    loop {
        if a_leaf == b_leaf {
            return UnionOutcome::AlreadyEqual;
        }
        if (*a_leaf).id == (*b_leaf).id {
            // equal ids on distinct nodes: only a clash if both are still
            // live leaves, otherwise one of them just needs re-descending
            if !(*a_leaf).bag.load(Ordering::Acquire).is_null()
                && !(*b_leaf).bag.load(Ordering::Acquire).is_null()
            {
                return UnionOutcome::IdClash;
            }
        } else {
            let (lo, hi) = if (*a_leaf).id < (*b_leaf).id {
                (a_leaf, b_leaf)
            } else {
                (b_leaf, a_leaf)
            };
            if (*hi)
                .next
                .compare_exchange(ptr::null_mut(), lo, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                // the linearization point of the union
                return UnionOutcome::Merged { src: hi, dst: lo };
            }
        }
        // another merge got there first; refresh both leaves and retry
        a_leaf = descend_merging(a_leaf).0;
        b_leaf = descend_merging(b_leaf).0;
    }
}

/// Second pass of the find: advance every pointer on the walked path to
/// the representative. Failed CASes mean someone compressed further
/// already, which is fine.
unsafe fn compress_path<S: SequentialHeap>(start: *mut HandleNode<S>, leaf: *mut HandleNode<S>) {
    let mut cur = start;
    while cur != leaf {
        let next = (*cur).next.load(Ordering::Acquire);
        if next.is_null() || next == leaf {
            break;
        }
        if (*leaf).id >= (*next).id {
            // a racing find already compressed past our representative;
            // pointers must only ever advance to smaller ids
            break;
        }
        let _ = (*cur)
            .next
            .compare_exchange(next, leaf, Ordering::AcqRel, Ordering::Acquire);
        cur = next;
    }
}
