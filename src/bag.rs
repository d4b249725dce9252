//! Width-sized arrays of slot nodes and the cross-bag merge protocol.
//!
//! A bag is the physical storage of one queue: `width` cache-padded slot
//! nodes, each holding a sequential heap. Operations pick a random starting
//! slot and walk cyclically, so `width` concurrent threads spread out with
//! high probability; that spreading is where the "relaxed" rank bound of
//! `remove_any` comes from.
//!
//! Merging is per-slot: slot `i` of the source bag is appended to the
//! pending-merge list of slot `i` of the destination bag with nothing but
//! CAS. The append protocol tolerates helpers racing on the same source
//! (many threads may drive one merge to completion) and destinations that
//! are themselves being merged away mid-walk.

use crate::arena::NodeArena;
use crate::chain::{self, HandleNode};
use crate::slot::{self, Apply, Probe, SlotCell, SlotNode};
use crate::sync::Ordering;
use crate::traits::SequentialHeap;
use crossbeam_utils::CachePadded;
use std::alloc::Layout;
use std::ptr::{self, NonNull};

#[cfg(not(loom))]
fn random_start(width: usize) -> usize {
    use rand::Rng;
    if width <= 1 {
        return 0;
    }
    rand::thread_rng().gen_range(0..width)
}

// loom explorations must be deterministic
#[cfg(loom)]
fn random_start(_width: usize) -> usize {
    0
}

/// Outcome of one full single-visit pass over a bag's slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PassOutcome {
    /// Every slot was observed and accepted by the callback.
    Clean,
    /// A slot was contended or rejected by the callback.
    Dirty,
    /// The bag has been merged away; re-resolve the handle chain.
    NewBag,
}

pub(crate) struct Bag<S: SequentialHeap> {
    width: usize,
    slots: NonNull<CachePadded<SlotNode<S>>>,
}

impl<S: SequentialHeap> Bag<S> {
    /// Allocates a bag and its slot array from `arena`.
    ///
    /// # Safety
    ///
    /// `handle` must point to the handle node that will own the bag and
    /// must stay valid for the arena's lifetime.
    pub(crate) unsafe fn new_in<A: NodeArena>(
        arena: &A,
        width: usize,
        handle: *const HandleNode<S>,
    ) -> *mut Bag<S> {
        debug_assert!(width > 0);
        let layout = Layout::array::<CachePadded<SlotNode<S>>>(width)
            .expect("slot array layout overflow");
        let slots = arena.alloc_bytes(layout).cast::<CachePadded<SlotNode<S>>>();
        for i in 0..width {
            slots
                .as_ptr()
                .add(i)
                .write(CachePadded::new(SlotNode::new(handle)));
        }
        arena.alloc(Bag { width, slots }).as_ptr()
    }

    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> &SlotNode<S> {
        debug_assert!(index < self.width);
        unsafe { &*self.slots.as_ptr().add(index) }
    }

    /// Runs `dg` against slots in random cyclic order until it finishes.
    ///
    /// Returns `true` once `dg` reports completion, `false` when the bag
    /// has been merged away and the caller must re-resolve. Slots that are
    /// locked or bail out are simply skipped; the loop keeps cycling, so
    /// blocking operations block here by revisiting.
    pub(crate) fn try_apply_until(
        &self,
        dg: &mut impl FnMut(&mut SlotCell<'_, S>) -> bool,
    ) -> bool {
        let mut index = random_start(self.width);
        loop {
            match self.slot(index).try_evaluate_and_apply(&mut *dg) {
                Apply::Finished => return true,
                Apply::NextBag => return false,
                Apply::NextElem => index = (index + 1) % self.width,
            }
        }
    }

    /// Visits every slot exactly once in random cyclic order, feeding
    /// `(index, version, empty)` observations to `accept`. Used by the
    /// two-pass snapshot emptiness probe; any slot that cannot be observed
    /// without waiting poisons the pass.
    pub(crate) fn try_probe_each(
        &self,
        accept: &mut impl FnMut(usize, u64, bool) -> bool,
    ) -> PassOutcome {
        let start = random_start(self.width);
        for offset in 0..self.width {
            let index = (start + offset) % self.width;
            match self.slot(index).try_probe() {
                Probe::Observed { version, empty } => {
                    if !accept(index, version, empty) {
                        return PassOutcome::Dirty;
                    }
                }
                Probe::Busy => return PassOutcome::Dirty,
                Probe::NewBag => return PassOutcome::NewBag,
            }
        }
        PassOutcome::Clean
    }

    /// Moves every slot of this bag into the pending-merge lists of the
    /// destination handle's current bag, slot `i` to slot `i`.
    ///
    /// Lock-free: nothing here takes a lock, and a slot node leaves the
    /// loop only once it is owned by *some* destination slot — possibly a
    /// later one than first resolved, when the destination is itself being
    /// merged away underneath us.
    pub(crate) fn merge_per_element_into(&self, dest: *mut HandleNode<S>) {
        let start = random_start(self.width);
        for offset in 0..self.width {
            let index = (start + offset) % self.width;
            self.push_slot_into(self.slot(index), index, dest);
        }
    }

    fn push_slot_into(&self, node: &SlotNode<S>, index: usize, dest: *mut HandleNode<S>) {
        loop {
            if !node.owner().load(Ordering::Acquire).is_null() {
                // an earlier racing pass already found this node a home
                return;
            }
            let (dest_leaf, dest_bag) = unsafe { chain::find_closest_bag(dest) };
            let dest_bag = unsafe { &*dest_bag };
            debug_assert_eq!(dest_bag.width(), self.width);
            let dest_slot = dest_bag.slot(index);
            debug_assert!(!ptr::eq(dest_slot, node));

            let head = dest_slot.merge_head().load(Ordering::Acquire);
            if head.is_null() {
                // destination slot already drained into a further bag;
                // help that merge linearize, then re-resolve
                unsafe { chain::ensure_merged(dest_leaf) };
                continue;
            }
            if head == node.as_ptr() {
                // a helper linked it at the head already
                settle_ownership(node, dest_slot, || {
                    let _ = dest_slot.merge_head().compare_exchange(
                        node.as_ptr(),
                        slot::nil::<S>(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                });
                return;
            }
            if head == slot::nil::<S>() {
                if !node.owner().load(Ordering::Acquire).is_null() {
                    return;
                }
                if dest_slot
                    .merge_head()
                    .compare_exchange(
                        slot::nil::<S>(),
                        node.as_ptr(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    settle_ownership(node, dest_slot, || {
                        let _ = dest_slot.merge_head().compare_exchange(
                            node.as_ptr(),
                            slot::nil::<S>(),
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        );
                    });
                    return;
                }
                continue;
            }

            let tail = match find_appendable_tail(node.as_ptr(), head) {
                TailSearch::AlreadyLinked => {
                    // a helper already linked it somewhere in this list;
                    // the linker retracts it if the claim goes foreign
                    settle_ownership(node, dest_slot, || {});
                    return;
                }
                TailSearch::Restart => continue,
                TailSearch::Tail(tail) => tail,
            };
            let tail_ref = unsafe { &*tail };
            if !is_appendable(tail_ref, dest_slot) {
                // the tail belongs to a lost double-insert; its linker will
                // retract it, restart from a fresh head
                continue;
            }
            // A claimed node is linked or drained somewhere already; the
            // claim is ordered before any append behind the node, so this
            // re-read cannot miss it. Linking a second copy would cycle
            // the list.
            if !node.owner().load(Ordering::Acquire).is_null() {
                return;
            }
            match tail_ref.next().compare_exchange(
                slot::nil::<S>(),
                node.as_ptr(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // the old tail is now an interior element: remember it
                    // so later appenders can jump most of the list
                    unsafe { &*head }.skip().store(tail, Ordering::Release);
                    settle_ownership(node, dest_slot, || {
                        let _ = tail_ref.next().compare_exchange(
                            node.as_ptr(),
                            slot::nil::<S>(),
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        );
                    });
                    return;
                }
                // DUMMY tombstone or a faster appender; restart from head
                Err(_) => continue,
            }
        }
    }
}

/// One-shot owner claim with confirmation. If a racing merge already owns
/// the node for a different slot, `undo` retracts this list link; the undo
/// CAS itself may lose to a subsequent appender, in which case the node
/// stays linked and the owning side's drain discards it as foreign.
fn settle_ownership<S: SequentialHeap>(
    node: &SlotNode<S>,
    dest_slot: &SlotNode<S>,
    undo: impl FnOnce(),
) {
    match node.owner().compare_exchange(
        ptr::null_mut(),
        dest_slot.as_ptr(),
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => {}
        Err(winner) if winner == dest_slot.as_ptr() => {}
        Err(_) => undo(),
    }
}

/// A tail is appendable only once it is owned by the destination slot;
/// claiming on the appender's behalf keeps the list from stalling behind
/// an inserter that linked but has not yet claimed.
fn is_appendable<S: SequentialHeap>(tail: &SlotNode<S>, dest_slot: &SlotNode<S>) -> bool {
    match tail.owner().compare_exchange(
        ptr::null_mut(),
        dest_slot.as_ptr(),
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => true,
        Err(winner) => winner == dest_slot.as_ptr(),
    }
}

enum TailSearch<S: SequentialHeap> {
    /// Current tail, whose `next` is `NIL`.
    Tail(*mut SlotNode<S>),
    /// The node being inserted was encountered during the walk.
    AlreadyLinked,
    /// The walk ran into a `DUMMY` tombstone; restart from a fresh head.
    Restart,
}

/// Walks the pending-merge list for the current tail, following the head's
/// tail-skip hint when it is still live. The walk also watches for `node`
/// itself: a list has exactly one tail, so if a helper linked `node`
/// already, following `next` pointers is guaranteed to run into it.
fn find_appendable_tail<S: SequentialHeap>(
    node: *mut SlotNode<S>,
    head: *mut SlotNode<S>,
) -> TailSearch<S> {
    let head_ref = unsafe { &*head };
    let mut cur = head;
    let mut via_hint = false;

    let hint = head_ref.skip().load(Ordering::Acquire);
    if !hint.is_null() && hint != head && hint != node {
        if unsafe { &*hint }.next().load(Ordering::Acquire) != slot::dummy::<S>() {
            // hints always point at reachable interior nodes, so jumping
            // is safe whenever the target has not been tombstoned
            cur = hint;
            via_hint = true;
        } else {
            head_ref.skip().store(ptr::null_mut(), Ordering::Release);
        }
    }

    loop {
        if cur == node {
            return TailSearch::AlreadyLinked;
        }
        let next = unsafe { &*cur }.next().load(Ordering::Acquire);
        if next == slot::nil::<S>() {
            return TailSearch::Tail(cur);
        }
        if next == slot::dummy::<S>() {
            if via_hint {
                head_ref.skip().store(ptr::null_mut(), Ordering::Release);
            }
            return TailSearch::Restart;
        }
        cur = next;
    }
}
