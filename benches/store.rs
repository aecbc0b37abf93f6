//! Benchmarks for BlockStore operations.
//!
//! Run with: cargo bench --bench store

use blockheap::{Block, BlockStore};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Generate a key from an index.
fn make_key(index: usize) -> String {
    format!("block:{:016x}", index)
}

/// Build a full store with timestamps equal to insertion order.
fn full_store(capacity: usize) -> BlockStore {
    let mut store = BlockStore::new(capacity);
    for i in 0..capacity {
        let _ = store.add_block(Block::new(make_key(i), i as u64, 0.0));
    }
    store
}

/// Benchmark admission into a full store (every add evicts).
fn bench_add_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/add_evict");

    for capacity in [1 << 10, 1 << 14, 1 << 18] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let mut store = full_store(capacity);
                let mut next = capacity;

                b.iter(|| {
                    let block = Block::new(make_key(next), next as u64, 0.0);
                    let _ = black_box(store.add_block(block));
                    next += 1;
                });
            },
        );
    }

    group.finish();
}

/// Benchmark key lookups that hit.
fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/get_hit");

    for capacity in [1 << 10, 1 << 14, 1 << 18] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let store = full_store(capacity);
                let keys: Vec<String> = (0..capacity).map(make_key).collect();
                let mut idx = 0usize;

                b.iter(|| {
                    black_box(store.get_block(black_box(&keys[idx])));
                    idx = (idx + 1) % capacity;
                });
            },
        );
    }

    group.finish();
}

/// Benchmark touching the earliest block.
fn bench_touch_earliest(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/touch_earliest");

    for capacity in [1 << 10, 1 << 14, 1 << 18] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let mut store = full_store(capacity);

                b.iter(|| {
                    black_box(store.update_earliest_block(1.0));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark bulk construction.
fn bench_from_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/from_blocks");

    for capacity in [1 << 10, 1 << 14] {
        let blocks: Vec<Block> = (0..capacity)
            .map(|i| Block::new(make_key(i), (capacity - i) as u64, 0.0))
            .collect();

        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &blocks,
            |b, blocks| {
                b.iter(|| black_box(BlockStore::from_blocks(blocks.clone())));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_evict,
    bench_get_hit,
    bench_touch_earliest,
    bench_from_blocks
);
criterion_main!(benches);
