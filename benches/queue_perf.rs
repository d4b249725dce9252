//! Throughput benchmarks for the queue façade over each bundled slot heap.
//!
//! ```bash
//! cargo bench --bench queue_perf
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mergeable_pq::{PairingHeap, PriorityQueue, SequentialHeap, SkewHeap, StdBinaryHeap};

const N: usize = 10_000;
const WIDTH: usize = 8;

fn insert_then_drain<S: SequentialHeap<Item = u64> + Send>() {
    let pq = PriorityQueue::<S>::new(0, WIDTH);
    for i in 0..N {
        pq.insert(black_box(i as u64));
    }
    for _ in 0..N {
        black_box(pq.remove_any());
    }
}

fn bench_insert_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_then_drain");
    group.bench_function(BenchmarkId::new("skew", N), |b| {
        b.iter(insert_then_drain::<SkewHeap<u64>>)
    });
    group.bench_function(BenchmarkId::new("pairing", N), |b| {
        b.iter(insert_then_drain::<PairingHeap<u64>>)
    });
    group.bench_function(BenchmarkId::new("std_binary", N), |b| {
        b.iter(insert_then_drain::<StdBinaryHeap<u64>>)
    });
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    c.bench_function("merge_and_drain_union", |b| {
        b.iter(|| {
            let left = PriorityQueue::<SkewHeap<u64>>::new(0, WIDTH);
            let right = PriorityQueue::<SkewHeap<u64>>::new(1, WIDTH);
            for i in 0..1_000u64 {
                left.insert(i);
                right.insert(1_000 + i);
            }
            black_box(left.merge(&right));
            for _ in 0..2_000 {
                black_box(left.remove_any());
            }
        })
    });
}

criterion_group!(benches, bench_insert_drain, bench_merge);
criterion_main!(benches);
