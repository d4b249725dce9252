//! loom model-checked interleavings of the concurrent core.
//!
//! Run with:
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --test loom --release
//! ```
//!
//! The models are deliberately tiny (two threads, one or two elements);
//! loom explores every interleaving of the atomics, which is where the
//! pending-merge drain and the union CAS earn their keep.
#![cfg(loom)]

use loom::sync::Arc;
use loom::thread;
use mergeable_pq::{MergeResult, PriorityQueue, SkewHeap};

#[test]
fn insert_and_remove_never_lose_the_element() {
    loom::model(|| {
        let pq = Arc::new(PriorityQueue::<SkewHeap<u32>>::new(0, 2));

        let inserter = {
            let pq = Arc::clone(&pq);
            thread::spawn(move || pq.insert(1))
        };
        let remover = {
            let pq = Arc::clone(&pq);
            thread::spawn(move || pq.try_remove_any(2))
        };

        inserter.join().unwrap();
        let removed = remover.join().unwrap();
        let leftover = pq.try_remove_any(4);

        match removed {
            Some(v) => {
                assert_eq!(v, 1);
                assert_eq!(leftover, None);
            }
            None => assert_eq!(leftover, Some(1)),
        }
    });
}

#[test]
fn two_inserters_account_for_both_elements() {
    loom::model(|| {
        let pq = Arc::new(PriorityQueue::<SkewHeap<u32>>::new(0, 2));

        let a = {
            let pq = Arc::clone(&pq);
            thread::spawn(move || pq.insert(1))
        };
        let b = {
            let pq = Arc::clone(&pq);
            thread::spawn(move || pq.insert(2))
        };
        a.join().unwrap();
        b.join().unwrap();

        let mut drained = vec![
            pq.try_remove_any(4).unwrap(),
            pq.try_remove_any(4).unwrap(),
        ];
        drained.sort();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(pq.try_remove_any(4), None);
    });
}

#[test]
fn merge_races_with_insert_without_losing_elements() {
    loom::model(|| {
        let a = Arc::new(PriorityQueue::<SkewHeap<u32>>::new(0, 1));
        let b = Arc::new(PriorityQueue::<SkewHeap<u32>>::new(1, 1));
        b.insert(7);

        let merger = {
            let a = Arc::clone(&a);
            let b = Arc::clone(&b);
            thread::spawn(move || assert_eq!(a.merge(&b), MergeResult::Success))
        };
        let inserter = {
            let b = Arc::clone(&b);
            thread::spawn(move || b.insert(9))
        };
        merger.join().unwrap();
        inserter.join().unwrap();

        let mut drained = vec![a.remove_any(), a.remove_any()];
        drained.sort();
        assert_eq!(drained, vec![7, 9]);
        assert_eq!(a.try_remove_any(2), None);
    });
}
