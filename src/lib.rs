//! Relaxed Concurrent Mergeable Priority Queues
//!
//! This crate provides a priority queue that many threads can use
//! simultaneously and, unusually, that supports *merging*: two independent
//! queues can be fused with lock-free progress, after which every handle
//! to either queue sees the union.
//!
//! # Design
//!
//! A queue is a **bag** of `width` slots, each holding an ordinary
//! sequential heap behind a try-lock. Operations pick a random slot and
//! work there, so up to `width` threads proceed in parallel and the
//! element returned by `remove_any` is of approximately low rank rather
//! than the strict minimum (a *relaxed* priority queue, in the sense of
//! SprayList-style designs).
//!
//! Merging is two-layered:
//!
//! - A union-find **handle chain** records which queues have been fused.
//!   One CAS links the higher-id queue under the lower-id one; that CAS is
//!   the merge's linearization point for queue identity.
//! - Each slot of the condemned bag is then pushed onto a lock-free
//!   intrusive **pending-merge list** of the matching slot in the
//!   surviving bag. Whoever next locks a slot drains its pending list
//!   into the slot's heap before doing anything else, so contents arrive
//!   lazily but before they can be missed.
//!
//! The remove path never waits on a nested lock: if draining needs a slot
//! that someone else holds, the whole operation bails out, releases its
//! own lock, and retries elsewhere. That bailout discipline is what makes
//! `try_remove_any` deadlock-free under any bounded number of threads.
//!
//! # Plug-in heaps
//!
//! The per-slot heap is a type parameter implementing [`SequentialHeap`].
//! Three implementations are bundled:
//!
//! - [`SkewHeap`]: the default; O(log n) amortized everything, cheap
//!   structural merge
//! - [`PairingHeap`]: O(1) insert and merge, O(log n) amortized
//!   delete-min
//! - [`StdBinaryHeap`]: `std::collections::BinaryHeap` adapter, the
//!   no-unsafe baseline
//!
//! # Example
//!
//! ```rust
//! use mergeable_pq::{MergeResult, PriorityQueue, SkewHeap};
//!
//! let low = PriorityQueue::<SkewHeap<u64>>::new(0, 4);
//! let high = PriorityQueue::<SkewHeap<u64>>::new(1, 4);
//! for x in 0..100 {
//!     low.insert(x);
//!     high.insert(100 + x);
//! }
//!
//! assert_eq!(low.merge(&high), MergeResult::Success);
//! assert_eq!(low.merge(&high), MergeResult::WereAlreadyEqual);
//!
//! let mut drained: Vec<u64> = (0..200).map(|_| high.remove_any()).collect();
//! drained.sort();
//! assert_eq!(drained, (0..200).collect::<Vec<u64>>());
//! ```

pub mod arena;
mod bag;
pub mod binary;
mod chain;
mod lock;
pub mod pairing;
pub mod queue;
pub mod skew;
mod slot;
mod sync;
pub mod traits;

pub use arena::{BumpArena, GlobalArena, NodeArena};
pub use binary::StdBinaryHeap;
pub use pairing::PairingHeap;
pub use queue::PriorityQueue;
pub use skew::SkewHeap;
pub use traits::{MergeResult, SequentialHeap};
