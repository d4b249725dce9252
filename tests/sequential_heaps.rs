//! Generic tests for all bundled SequentialHeap implementations
//!
//! These tests work with any `SequentialHeap` implementation and stress
//! the trait interface with edge cases shared by every slot heap: empty
//! behavior, ordering, duplicates, and `merge_steal` semantics.

use mergeable_pq::{PairingHeap, SequentialHeap, SkewHeap, StdBinaryHeap};

/// Generate the shared test suite for a heap type using a module
macro_rules! sequential_heap_tests {
    ($mod_name:ident, $heap_type:ty) => {
        mod $mod_name {
            use super::*;

            #[test]
            fn empty_heap() {
                let mut heap = <$heap_type>::new();
                assert!(heap.is_empty());
                assert_eq!(heap.len(), 0);
                assert_eq!(heap.peek_min(), None);
                assert_eq!(heap.delete_min(), None);
            }

            #[test]
            fn basic_ordering() {
                let mut heap = <$heap_type>::new();
                heap.insert(5);
                heap.insert(1);
                heap.insert(10);
                heap.insert(3);

                assert!(!heap.is_empty());
                assert_eq!(heap.len(), 4);
                assert_eq!(heap.peek_min(), Some(&1));

                assert_eq!(heap.delete_min(), Some(1));
                assert_eq!(heap.delete_min(), Some(3));
                assert_eq!(heap.delete_min(), Some(5));
                assert_eq!(heap.delete_min(), Some(10));
                assert_eq!(heap.delete_min(), None);
                assert!(heap.is_empty());
            }

            #[test]
            fn duplicates_all_come_back() {
                let mut heap = <$heap_type>::new();
                heap.insert(5);
                heap.insert(5);
                heap.insert(5);
                heap.insert(1);

                assert_eq!(heap.delete_min(), Some(1));
                for _ in 0..3 {
                    assert_eq!(heap.delete_min(), Some(5));
                }
                assert_eq!(heap.delete_min(), None);
            }

            #[test]
            fn peek_is_idempotent() {
                let mut heap = <$heap_type>::new();
                heap.insert(5);
                heap.insert(1);

                assert_eq!(heap.peek_min(), Some(&1));
                assert_eq!(heap.peek_min(), Some(&1));
                assert_eq!(heap.len(), 2);
            }

            #[test]
            fn merge_steal_absorbs_everything() {
                let mut a = <$heap_type>::new();
                a.insert(5);
                a.insert(1);

                let mut b = <$heap_type>::new();
                b.insert(10);
                b.insert(3);

                a.merge_steal(&mut b);

                assert!(b.is_empty());
                assert_eq!(b.len(), 0);
                assert_eq!(a.len(), 4);
                assert_eq!(a.delete_min(), Some(1));
                assert_eq!(a.delete_min(), Some(3));
                assert_eq!(a.delete_min(), Some(5));
                assert_eq!(a.delete_min(), Some(10));
            }

            #[test]
            fn merge_steal_with_empty_sides() {
                let mut a = <$heap_type>::new();
                a.insert(7);
                let mut empty = <$heap_type>::new();

                a.merge_steal(&mut empty);
                assert_eq!(a.len(), 1);

                let mut other = <$heap_type>::new();
                other.merge_steal(&mut a);
                assert!(a.is_empty());
                assert_eq!(other.delete_min(), Some(7));
            }

            #[test]
            fn interleaved_insert_and_delete() {
                let mut heap = <$heap_type>::new();
                for i in 0..200 {
                    heap.insert(i * 2);
                    heap.insert(i * 2 + 1);
                    let min = heap.delete_min().unwrap();
                    assert!(min <= i * 2);
                }
                let mut last = i32::MIN;
                while let Some(x) = heap.delete_min() {
                    assert!(x >= last);
                    last = x;
                }
            }

            #[test]
            fn descending_inserts_sort_ascending() {
                let mut heap = <$heap_type>::new();
                for i in (0..500).rev() {
                    heap.insert(i);
                }
                for i in 0..500 {
                    assert_eq!(heap.delete_min(), Some(i));
                }
            }
        }
    };
}

sequential_heap_tests!(skew, SkewHeap<i32>);
sequential_heap_tests!(pairing, PairingHeap<i32>);
sequential_heap_tests!(std_binary, StdBinaryHeap<i32>);
