//! Public queue handle.
//!
//! A [`PriorityQueue`] is a handle onto shared queue state; clones of a
//! handle, and handles of queues that have been merged together, all see
//! one logical queue. Every operation resolves the handle chain first, so
//! a merge observed as [`MergeResult::Success`] by one thread is observed
//! by every later operation on either handle.

use crate::arena::{GlobalArena, NodeArena};
use crate::bag::PassOutcome;
use crate::chain::{self, HandleNode, UnionOutcome};
use crate::slot::SlotCell;
use crate::sync::{AtomicPtr, Ordering};
use crate::traits::{MergeResult, SequentialHeap};
use std::fmt;
use std::sync::Arc;

/// A relaxed, concurrent, mergeable priority queue.
///
/// The queue is *relaxed*: [`remove_any`](Self::remove_any) returns an
/// element of approximately low rank rather than the strict minimum. With
/// `width = p` slots and up to `p` threads spreading over them uniformly,
/// the expected rank of a removed element is O(p).
///
/// Progress guarantees, assuming at most `width` concurrently active
/// threads: `insert` and `merge` are lock-free; `try_remove_any` is
/// deadlock-free (a nested try-lock failure makes it release everything
/// and retry elsewhere, so it never waits on another thread's lock);
/// `remove_any` and `swap_empty_with` loop until success and never hold
/// two locks at once.
///
/// `S` is the sequential heap stored per slot, `A` the arena the
/// structural nodes are carved from, and `ENABLE_EMPTY` gates the
/// snapshot `empty()` probe (slot version counters are maintained either
/// way).
///
/// # Example
///
/// ```rust
/// use mergeable_pq::{MergeResult, PriorityQueue, SkewHeap};
///
/// let a = PriorityQueue::<SkewHeap<u32>>::new(0, 4);
/// let b = PriorityQueue::<SkewHeap<u32>>::new(1, 4);
/// a.insert(10);
/// b.insert(5);
///
/// assert_eq!(a.merge(&b), MergeResult::Success);
/// // both handles now drain the union
/// let mut drained = vec![a.remove_any(), b.remove_any()];
/// drained.sort();
/// assert_eq!(drained, vec![5, 10]);
/// ```
pub struct PriorityQueue<S, A = GlobalArena, const ENABLE_EMPTY: bool = false>
where
    S: SequentialHeap,
    A: NodeArena,
{
    node: AtomicPtr<HandleNode<S>>,
    id: usize,
    width: usize,
    arena: Arc<A>,
}

unsafe impl<S, A, const E: bool> Send for PriorityQueue<S, A, E>
where
    S: SequentialHeap + Send,
    A: NodeArena + Send + Sync,
{
}

unsafe impl<S, A, const E: bool> Sync for PriorityQueue<S, A, E>
where
    S: SequentialHeap + Send,
    A: NodeArena + Send + Sync,
{
}

impl<S: SequentialHeap, const E: bool> PriorityQueue<S, GlobalArena, E> {
    /// Creates a queue of `width` slots using the never-freeing
    /// [`GlobalArena`].
    ///
    /// `id` must be unique among simultaneously live queues that may ever
    /// be merged with this one; a clash is reported by
    /// [`merge`](Self::merge), not here.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn new(id: usize, width: usize) -> Self {
        Self::with_arena(id, width, Arc::new(GlobalArena))
    }
}

impl<S: SequentialHeap, A: NodeArena, const E: bool> PriorityQueue<S, A, E> {
    /// Creates a queue whose handle node, bag, and slots live in `arena`.
    ///
    /// The arena must outlive every queue carved from it *and* every queue
    /// any of them is merged with: merging links slot nodes of one queue
    /// into the pending-merge lists of the other, so the memory of both
    /// sides stays reachable from the survivor. Sharing a single arena per
    /// merge group is the intended pattern.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn with_arena(id: usize, width: usize, arena: Arc<A>) -> Self {
        assert!(width > 0, "queue width must be at least 1");
        let node = chain::make_handle::<S, A>(&*arena, id, width);
        PriorityQueue {
            node: AtomicPtr::new(node),
            id,
            width,
            arena,
        }
    }

    /// The id this handle was created with.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of slots per bag. Merges are only defined between queues of
    /// equal width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Resolves the current bag and runs `dg` against slots until it
    /// reports completion, re-resolving whenever the bag gets merged away
    /// underneath.
    fn apply(&self, mut dg: impl FnMut(&mut SlotCell<'_, S>) -> bool) {
        loop {
            let start = self.node.load(Ordering::Acquire);
            let (leaf, bag) = unsafe { chain::descend_merging(start) };
            if leaf != start {
                self.node.store(leaf, Ordering::Release);
            }
            if unsafe { &*bag }.try_apply_until(&mut dg) {
                return;
            }
        }
    }

    /// Inserts an element. Lock-free under bounded contention: a busy slot
    /// is skipped, never waited on.
    pub fn insert(&self, item: S::Item) {
        let mut item = Some(item);
        self.apply(|cell| {
            if let Some(item) = item.take() {
                cell.heap().insert(item);
                cell.bump_version();
            }
            true
        });
    }

    /// Removes and returns an element of approximately low rank.
    ///
    /// Returns `None` once more than `max_retries` slots have been
    /// observed empty. Slots that are merely locked by other threads do
    /// not count as retries; they are skipped and revisited.
    pub fn try_remove_any(&self, max_retries: usize) -> Option<S::Item> {
        let mut removed = None;
        let mut observed_empty = 0usize;
        self.apply(|cell| {
            if let Some(item) = cell.heap().delete_min() {
                cell.bump_version();
                removed = Some(item);
                true
            } else {
                observed_empty += 1;
                observed_empty > max_retries
            }
        });
        removed
    }

    /// Removes and returns an element of approximately low rank, looping
    /// until one is found. Blocks (by retrying) while the queue is empty.
    pub fn remove_any(&self) -> S::Item {
        let mut removed = None;
        self.apply(|cell| {
            if let Some(item) = cell.heap().delete_min() {
                cell.bump_version();
                removed = Some(item);
                true
            } else {
                false
            }
        });
        match removed {
            Some(item) => item,
            // apply only finishes once the callback reported success
            None => unreachable!("apply finished without removing"),
        }
    }

    /// Returns a clone of some slot's current minimum without removing it.
    ///
    /// Returns `None` once more than `max_retries` slots have been
    /// observed empty.
    pub fn try_peek_any(&self, max_retries: usize) -> Option<S::Item>
    where
        S::Item: Clone,
    {
        let mut peeked = None;
        let mut observed_empty = 0usize;
        self.apply(|cell| {
            if let Some(item) = cell.heap().peek_min() {
                peeked = Some(item.clone());
                true
            } else {
                observed_empty += 1;
                observed_empty > max_retries
            }
        });
        peeked
    }

    /// Swaps `src` into the first empty slot found, handing the slot's
    /// empty heap back through `src`. The queue absorbs `src`'s entire
    /// contents in one linearizable step. Blocks (by retrying) while no
    /// slot is empty.
    pub fn swap_empty_with(&self, src: &mut S) {
        self.apply(|cell| {
            if cell.heap().is_empty() {
                std::mem::swap(cell.heap(), src);
                cell.bump_version();
                true
            } else {
                false
            }
        });
    }

    /// Merges `other` into this queue.
    ///
    /// On [`MergeResult::Success`] the two handles refer to one queue from
    /// the union's linearization point on; the direction of the merge (who
    /// keeps its bag) is decided by queue ids and is not observable
    /// through the API. The non-`Success` outcomes mutate nothing.
    ///
    /// Lock-free: concurrent merges, inserts, and removals may proceed
    /// while the source bag is being drained; drains are completed lazily
    /// by whoever touches the affected slots next.
    pub fn merge(&self, other: &Self) -> MergeResult {
        if self.width != other.width {
            return MergeResult::Incompatible;
        }
        let outcome = unsafe {
            chain::try_union(
                self.node.load(Ordering::Acquire),
                other.node.load(Ordering::Acquire),
            )
        };
        match outcome {
            UnionOutcome::AlreadyEqual => MergeResult::WereAlreadyEqual,
            UnionOutcome::IdClash => MergeResult::IdClash,
            UnionOutcome::Merged { src, dst } => {
                unsafe { chain::ensure_merged_into(src, dst) };
                self.node.store(dst, Ordering::Release);
                other.node.store(dst, Ordering::Release);
                MergeResult::Success
            }
        }
    }
}

impl<S: SequentialHeap, A: NodeArena> PriorityQueue<S, A, true> {
    /// Linearizable snapshot emptiness probe.
    ///
    /// Two full passes visit every slot once under its lock, recording a
    /// per-slot version in the first pass and requiring the slot to still
    /// be empty at the same version in the second. If both passes succeed
    /// the queue was empty at the instant between them. Any non-empty
    /// observation, version change, or contended slot yields `false`;
    /// the probe never waits.
    pub fn empty(&self) -> bool {
        loop {
            let start = self.node.load(Ordering::Acquire);
            let (leaf, bag) = unsafe { chain::descend_merging(start) };
            if leaf != start {
                self.node.store(leaf, Ordering::Release);
            }
            let bag = unsafe { &*bag };
            let mut versions = vec![0u64; bag.width()];
            match bag.try_probe_each(&mut |index, version, empty| {
                versions[index] = version;
                empty
            }) {
                PassOutcome::Clean => {}
                PassOutcome::Dirty => return false,
                PassOutcome::NewBag => continue,
            }
            match bag.try_probe_each(&mut |index, version, empty| {
                empty && versions[index] == version
            }) {
                PassOutcome::Clean => return true,
                PassOutcome::Dirty => return false,
                PassOutcome::NewBag => continue,
            }
        }
    }
}

impl<S: SequentialHeap, A: NodeArena, const E: bool> Clone for PriorityQueue<S, A, E> {
    /// Returns another handle onto the same queue.
    fn clone(&self) -> Self {
        PriorityQueue {
            node: AtomicPtr::new(self.node.load(Ordering::Acquire)),
            id: self.id,
            width: self.width,
            arena: Arc::clone(&self.arena),
        }
    }
}

impl<S: SequentialHeap, A: NodeArena, const E: bool> fmt::Debug for PriorityQueue<S, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("id", &self.id)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}
