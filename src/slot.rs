//! Bag slot nodes and the pending-merge drain protocol.
//!
//! A slot node owns one sequential heap behind a test-and-set lock, and at
//! the same time is the link element of a lock-free intrusive singly-linked
//! list: during a cross-queue merge, every slot node of the source bag is
//! appended to the pending-merge list of the same-index slot in the
//! destination bag. Readers drain those lists lazily, under the slot lock,
//! before touching the heap.
//!
//! Pointer state machines (all transitions are one-way):
//!
//! - `merge_head`: `NIL` → node → … → null. `NIL` is the empty list; null
//!   means this node has itself been drained into another slot and is dead.
//! - `next`: `NIL` → node → `DUMMY`, or `NIL` → `DUMMY`. `DUMMY` is the
//!   tombstone a drainer plants in a dead tail so late appenders restart
//!   from the head.
//! - `owner`: null → owning slot, set exactly once. A node can transiently
//!   sit in two destination lists when two merges race over the same
//!   source bag; the owner CAS picks the single winner and the losing
//!   inserter unlinks its copy.
//!
//! `NIL` and `DUMMY` are dedicated static addresses, not null: null on
//! `merge_head` is reserved for the drained state.

use crate::chain::{self, HandleNode};
use crate::lock::TasLock;
use crate::sync::{AtomicPtr, AtomicU64, Ordering, UnsafeCell};
use crate::traits::SequentialHeap;
use std::ptr;

// Distinct values keep the linker from merging the two statics into one
// address; the pointers themselves are only ever compared for identity.
static NIL: u8 = 0;
static DUMMY: u8 = 1;

/// End-of-list sentinel. Identity comparison only, never dereferenced.
pub(crate) fn nil<S: SequentialHeap>() -> *mut SlotNode<S> {
    &NIL as *const u8 as *mut SlotNode<S>
}

/// Tombstone planted in a drained tail's `next`. Identity comparison only.
pub(crate) fn dummy<S: SequentialHeap>() -> *mut SlotNode<S> {
    &DUMMY as *const u8 as *mut SlotNode<S>
}

/// Outcome of one attempt to run a user operation against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Apply {
    /// The callback ran and reported completion.
    Finished,
    /// The slot was busy, empty-handed, or a nested try-lock bailed out;
    /// move on to another slot of the same bag.
    NextElem,
    /// This bag has been merged away; the caller must re-resolve its
    /// handle chain and retry on the current bag.
    NextBag,
}

/// Outcome of one locked snapshot probe of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// Lock acquired, pending merges drained; version and emptiness read.
    Observed { version: u64, empty: bool },
    /// The slot could not be observed without waiting.
    Busy,
    /// This bag has been merged away.
    NewBag,
}

/// A nested try-lock failed while draining; the caller releases its own
/// lock and retries elsewhere. Propagating this instead of waiting is what
/// keeps the remove path deadlock-free.
pub(crate) struct Bailout;

/// Mutable view of a locked slot's heap handed to operation callbacks.
pub(crate) struct SlotCell<'a, S: SequentialHeap> {
    heap: &'a mut S,
    version: &'a AtomicU64,
}

impl<'a, S: SequentialHeap> SlotCell<'a, S> {
    pub(crate) fn heap(&mut self) -> &mut S {
        self.heap
    }

    /// Records a successful mutation for the snapshot emptiness probe.
    pub(crate) fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) struct SlotNode<S: SequentialHeap> {
    lock: TasLock,
    elem: UnsafeCell<S>,
    version: AtomicU64,
    /// Slot that won this node in a cross-queue merge. Set at most once.
    owner: AtomicPtr<SlotNode<S>>,
    /// Head of this slot's pending-merge list.
    merge_head: AtomicPtr<SlotNode<S>>,
    /// Link field for membership in some other slot's pending-merge list.
    next: AtomicPtr<SlotNode<S>>,
    /// Tail-skip hint: some later, non-tail element of this slot's list.
    /// Best-effort; cleared when found stale.
    skip: AtomicPtr<SlotNode<S>>,
    /// Handle node whose bag this slot was created in. Immutable.
    handle: *const HandleNode<S>,
}

impl<S: SequentialHeap> SlotNode<S> {
    pub(crate) fn new(handle: *const HandleNode<S>) -> Self {
        SlotNode {
            lock: TasLock::new(),
            elem: UnsafeCell::new(S::new()),
            version: AtomicU64::new(0),
            owner: AtomicPtr::new(ptr::null_mut()),
            merge_head: AtomicPtr::new(nil::<S>()),
            next: AtomicPtr::new(nil::<S>()),
            skip: AtomicPtr::new(ptr::null_mut()),
            handle,
        }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut SlotNode<S> {
        self as *const SlotNode<S> as *mut SlotNode<S>
    }

    #[inline]
    pub(crate) fn owner(&self) -> &AtomicPtr<SlotNode<S>> {
        &self.owner
    }

    #[inline]
    pub(crate) fn merge_head(&self) -> &AtomicPtr<SlotNode<S>> {
        &self.merge_head
    }

    #[inline]
    pub(crate) fn next(&self) -> &AtomicPtr<SlotNode<S>> {
        &self.next
    }

    #[inline]
    pub(crate) fn skip(&self) -> &AtomicPtr<SlotNode<S>> {
        &self.skip
    }

    /// True once the handle-level merge condemning this slot's bag has
    /// linearized. From that point on, user operations must not land here:
    /// an element inserted after the slot is drained would be stranded.
    #[inline]
    fn merged_away(&self) -> bool {
        !unsafe { &*self.handle }.next_ptr().load(Ordering::Acquire).is_null()
    }

    fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Drains this slot's pending-merge list into its heap. Must be called
    /// with this slot's lock held.
    ///
    /// Each list entry is another bag's slot node that a merge routed
    /// here. Draining one entry means: linearize the handle-level merge it
    /// belongs to, try-lock it, recursively drain *its* pending list, steal
    /// its heap contents, tombstone it, and unlink it. Any failed nested
    /// try-lock aborts the whole drain with [`Bailout`].
    pub(crate) fn evaluate_merges(&self) -> Result<(), Bailout> {
        debug_assert!(self.lock.is_locked());
        loop {
            let cur = self.merge_head.load(Ordering::Acquire);
            if cur == nil::<S>() {
                return Ok(());
            }
            if cur.is_null() {
                // a drained node never re-enters service; reaching this
                // branch means the append protocol has been violated
                debug_assert!(false, "pending-merge drain on a drained slot node");
                return Ok(());
            }
            let cur_ref = unsafe { &*cur };
            // Claim the head for this slot if its inserter has not yet.
            // Both sides CAS the same winning value, so the race is benign.
            match cur_ref.owner.compare_exchange(
                ptr::null_mut(),
                self.as_ptr(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {}
                Err(winner) if winner == self.as_ptr() => {}
                Err(_) => {
                    // Lost double-insert: the node belongs to another bag's
                    // slot. Its inserter is responsible for unlinking it,
                    // but helping here avoids spinning behind a stalled
                    // peer. Foreign nodes never have successors in this
                    // list, so dropping the head loses nothing.
                    let _ = self.merge_head.compare_exchange(
                        cur,
                        nil::<S>(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    continue;
                }
            }
            // The handle-level merge that routed `cur` here linearizes
            // before its contents become reachable through this slot.
            unsafe { chain::ensure_merged(cur_ref.handle) };
            if !cur_ref.lock.try_lock() {
                return Err(Bailout);
            }
            // Drain cur completely, then tombstone its own list head. An
            // appender that slips a new source into cur's list between the
            // steal and the tombstone CAS sends us around again.
            loop {
                if let Err(bail) = cur_ref.evaluate_merges() {
                    cur_ref.lock.unlock();
                    return Err(bail);
                }
                self.elem.with_mut(|dst| {
                    cur_ref.elem.with_mut(|src| unsafe {
                        if !(*src).is_empty() {
                            (*dst).merge_steal(&mut *src);
                            self.bump_version();
                            cur_ref.bump_version();
                        }
                    })
                });
                match cur_ref.merge_head.compare_exchange(
                    nil::<S>(),
                    ptr::null_mut(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => break,
                    // already tombstoned: re-draining an empty node is a
                    // no-op, don't spin on the impossible exchange
                    Err(observed) if observed.is_null() => break,
                    Err(_) => {}
                }
            }
            self.unlink_drained_head(cur_ref);
            cur_ref.lock.unlock();
        }
    }

    /// Removes the drained head `cur` from this slot's pending list.
    ///
    /// Only the lock holder drains, so the head CASes here cannot lose to
    /// another drainer; the only concurrent writers are appenders, and
    /// those are fenced out by the `DUMMY` tombstone.
    fn unlink_drained_head(&self, cur: &SlotNode<S>) {
        let succ = cur.next.load(Ordering::Acquire);
        if succ == dummy::<S>() {
            // only reachable if a drained node re-entered a pending list,
            // which the append protocol is supposed to rule out
            debug_assert!(false, "drained node re-entered a pending list");
            let _ = self.merge_head.compare_exchange(
                cur.as_ptr(),
                nil::<S>(),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            return;
        }
        if succ != nil::<S>() {
            let unlinked = self
                .merge_head
                .compare_exchange(cur.as_ptr(), succ, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            debug_assert!(unlinked);
        } else if cur
            .next
            .compare_exchange(nil::<S>(), dummy::<S>(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let unlinked = self
                .merge_head
                .compare_exchange(cur.as_ptr(), nil::<S>(), Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            debug_assert!(unlinked);
        } else {
            // an append landed just before the tombstone; it is the new head
            let succ = cur.next.load(Ordering::Acquire);
            debug_assert!(succ != nil::<S>() && succ != dummy::<S>());
            let unlinked = self
                .merge_head
                .compare_exchange(cur.as_ptr(), succ, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            debug_assert!(unlinked);
        }
    }

    /// Try-locks the slot, drains pending merges, and runs `dg` against the
    /// heap. `dg` returns `true` to finish the enclosing apply loop.
    pub(crate) fn try_evaluate_and_apply(
        &self,
        dg: &mut impl FnMut(&mut SlotCell<'_, S>) -> bool,
    ) -> Apply {
        if !self.lock.try_lock() {
            return Apply::NextElem;
        }
        if self.merged_away() {
            self.lock.unlock();
            return Apply::NextBag;
        }
        if self.evaluate_merges().is_err() {
            self.lock.unlock();
            return Apply::NextElem;
        }
        let finished = self.elem.with_mut(|heap| {
            let mut cell = SlotCell {
                heap: unsafe { &mut *heap },
                version: &self.version,
            };
            dg(&mut cell)
        });
        self.lock.unlock();
        if finished {
            Apply::Finished
        } else {
            Apply::NextElem
        }
    }

    /// Locked snapshot of (version, emptiness) for the two-pass emptiness
    /// probe. Refuses to wait: contention reports [`Probe::Busy`].
    pub(crate) fn try_probe(&self) -> Probe {
        if !self.lock.try_lock() {
            return Probe::Busy;
        }
        if self.merged_away() {
            self.lock.unlock();
            return Probe::NewBag;
        }
        if self.evaluate_merges().is_err() {
            self.lock.unlock();
            return Probe::Busy;
        }
        let version = self.version.load(Ordering::Relaxed);
        let empty = self.elem.with(|heap| unsafe { (*heap).is_empty() });
        self.lock.unlock();
        Probe::Observed { version, empty }
    }
}
