//! Property-based tests using proptest
//!
//! Random operation sequences are checked against simple reference
//! models: a sorted multiset for the sequential heaps, and multiset
//! accounting for the queue façade (whose only sequential guarantee is
//! that nothing is ever lost or duplicated).

use proptest::prelude::*;
use std::collections::BTreeMap;

use mergeable_pq::{
    MergeResult, PairingHeap, PriorityQueue, SequentialHeap, SkewHeap, StdBinaryHeap,
};

fn multiset(values: impl IntoIterator<Item = i32>) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
}

/// Heap ops against a sorted-model oracle: delete_min must always return
/// the true minimum of what remains.
fn check_heap_against_model<H: SequentialHeap<Item = i32>>(
    ops: Vec<(bool, i32)>,
) -> Result<(), TestCaseError> {
    let mut heap = H::new();
    let mut model: Vec<i32> = Vec::new();

    for (should_pop, value) in ops {
        if should_pop && !model.is_empty() {
            let popped = heap.delete_min();
            let expected = model.iter().copied().min();
            if let Some(pos) = model.iter().position(|&x| Some(x) == expected) {
                model.remove(pos);
            }
            prop_assert_eq!(popped, expected);
        } else {
            heap.insert(value);
            model.push(value);
        }
        prop_assert_eq!(heap.len(), model.len());
        prop_assert_eq!(heap.peek_min().copied(), model.iter().copied().min());
    }

    let mut drained = Vec::new();
    while let Some(x) = heap.delete_min() {
        drained.push(x);
    }
    let mut sorted_model = model;
    sorted_model.sort();
    prop_assert_eq!(drained, sorted_model);
    Ok(())
}

/// merge_steal must be exactly "move everything across".
fn check_merge_steal<H: SequentialHeap<Item = i32>>(
    left: Vec<i32>,
    right: Vec<i32>,
) -> Result<(), TestCaseError> {
    let mut a = H::new();
    let mut b = H::new();
    for &x in &left {
        a.insert(x);
    }
    for &x in &right {
        b.insert(x);
    }

    a.merge_steal(&mut b);

    prop_assert!(b.is_empty());
    prop_assert_eq!(a.len(), left.len() + right.len());

    let mut drained = Vec::new();
    while let Some(x) = a.delete_min() {
        drained.push(x);
    }
    let mut expected: Vec<i32> = left.into_iter().chain(right).collect();
    expected.sort();
    prop_assert_eq!(drained, expected);
    Ok(())
}

proptest! {
    #[test]
    fn skew_heap_matches_model(ops in prop::collection::vec((any::<bool>(), -1000i32..1000), 0..300)) {
        check_heap_against_model::<SkewHeap<i32>>(ops)?;
    }

    #[test]
    fn pairing_heap_matches_model(ops in prop::collection::vec((any::<bool>(), -1000i32..1000), 0..300)) {
        check_heap_against_model::<PairingHeap<i32>>(ops)?;
    }

    #[test]
    fn std_binary_heap_matches_model(ops in prop::collection::vec((any::<bool>(), -1000i32..1000), 0..300)) {
        check_heap_against_model::<StdBinaryHeap<i32>>(ops)?;
    }

    #[test]
    fn skew_merge_steal_moves_everything(
        left in prop::collection::vec(-1000i32..1000, 0..100),
        right in prop::collection::vec(-1000i32..1000, 0..100),
    ) {
        check_merge_steal::<SkewHeap<i32>>(left, right)?;
    }

    #[test]
    fn pairing_merge_steal_moves_everything(
        left in prop::collection::vec(-1000i32..1000, 0..100),
        right in prop::collection::vec(-1000i32..1000, 0..100),
    ) {
        check_merge_steal::<PairingHeap<i32>>(left, right)?;
    }

    #[test]
    fn queue_drain_is_a_permutation_of_inserts(
        values in prop::collection::vec(-1000i32..1000, 0..200),
        width in 1usize..5,
    ) {
        let pq = PriorityQueue::<SkewHeap<i32>>::new(0, width);
        for &x in &values {
            pq.insert(x);
        }
        let drained: Vec<i32> = (0..values.len()).map(|_| pq.remove_any()).collect();
        prop_assert_eq!(multiset(drained), multiset(values));
        prop_assert_eq!(pq.try_remove_any(width * 4), None);
    }

    #[test]
    fn width_one_queue_is_exact(
        values in prop::collection::vec(-1000i32..1000, 0..200),
    ) {
        let pq = PriorityQueue::<SkewHeap<i32>>::new(0, 1);
        for &x in &values {
            pq.insert(x);
        }
        let drained: Vec<i32> = (0..values.len()).map(|_| pq.remove_any()).collect();
        let mut expected = values;
        expected.sort();
        prop_assert_eq!(drained, expected);
    }

    #[test]
    fn merged_queues_drain_the_union(
        left in prop::collection::vec(-1000i32..1000, 0..150),
        right in prop::collection::vec(-1000i32..1000, 0..150),
        width in 1usize..4,
    ) {
        let a = PriorityQueue::<SkewHeap<i32>>::new(0, width);
        let b = PriorityQueue::<SkewHeap<i32>>::new(1, width);
        for &x in &left {
            a.insert(x);
        }
        for &x in &right {
            b.insert(x);
        }

        prop_assert_eq!(a.merge(&b), MergeResult::Success);

        let total = left.len() + right.len();
        let drained: Vec<i32> = (0..total).map(|_| b.remove_any()).collect();
        let expected: Vec<i32> = left.into_iter().chain(right).collect();
        prop_assert_eq!(multiset(drained), multiset(expected));
    }
}
