//! Randomized operation sequences checked against a simple model.
//!
//! Timestamps are kept unique so the earliest block is never ambiguous.

use blockheap::{Block, BlockStore, PolynomialProber, ProbeHasher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

/// Reference model: key -> (timestamp, nonce).
struct Model {
    capacity: usize,
    blocks: HashMap<String, (u64, f64)>,
    max_timestamp: u64,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            blocks: HashMap::new(),
            max_timestamp: 0,
        }
    }

    fn earliest(&self) -> Option<(&String, u64)> {
        self.blocks
            .iter()
            .map(|(k, (ts, _))| (k, *ts))
            .min_by_key(|(_, ts)| *ts)
    }

    fn add(&mut self, key: &str, timestamp: u64, nonce: f64) -> bool {
        if self.blocks.len() >= self.capacity {
            if let Some((_, earliest)) = self.earliest() {
                if timestamp < earliest {
                    return false;
                }
            }
        }
        self.blocks.remove(key);
        if self.blocks.len() >= self.capacity {
            let (victim, _) = self.earliest().map(|(k, ts)| (k.clone(), ts)).unwrap();
            self.blocks.remove(&victim);
        }
        self.blocks.insert(key.to_string(), (timestamp, nonce));
        self.max_timestamp = self.max_timestamp.max(timestamp);
        true
    }

    fn pop(&mut self) -> Option<String> {
        let key = self.earliest().map(|(k, _)| k.clone())?;
        self.blocks.remove(&key);
        Some(key)
    }

    fn touch(&mut self, key: &str, nonce: f64) -> bool {
        if !self.blocks.contains_key(key) {
            return false;
        }
        self.max_timestamp += 1;
        self.blocks
            .insert(key.to_string(), (self.max_timestamp, nonce));
        true
    }
}

/// Source of timestamps that never repeats one already handed out.
struct Timestamps {
    used: HashSet<u64>,
}

impl Timestamps {
    fn new() -> Self {
        Self {
            used: HashSet::new(),
        }
    }

    fn fresh(&mut self, rng: &mut StdRng) -> u64 {
        loop {
            let ts = rng.random_range(1..100_000);
            if self.used.insert(ts) {
                return ts;
            }
        }
    }

    fn claim(&mut self, ts: u64) {
        self.used.insert(ts);
    }
}

fn check_against_model<H: ProbeHasher>(store: &BlockStore<H>, model: &Model) {
    store.verify().unwrap();
    assert_eq!(store.len(), model.blocks.len());
    assert_eq!(store.max_timestamp(), model.max_timestamp);

    for (key, (ts, nonce)) in &model.blocks {
        let block = store
            .get_block(key)
            .unwrap_or_else(|| panic!("{} missing", key));
        assert_eq!(block.timestamp(), *ts);
        assert_eq!(block.nonce(), *nonce);
    }

    match (store.get_earliest_block(), model.earliest()) {
        (Some(block), Some((key, ts))) => {
            assert_eq!(block.key(), key);
            assert_eq!(block.timestamp(), ts);
        }
        (None, None) => {}
        (actual, expected) => panic!("earliest mismatch: {:?} vs {:?}", actual, expected),
    }
}

fn run_random_ops<H: ProbeHasher>(mut store: BlockStore<H>, seed: u64, ops: usize, keyspace: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = Model::new(store.capacity());
    let mut timestamps = Timestamps::new();

    for _ in 0..ops {
        let key = format!("key:{}", rng.random_range(0..keyspace));
        let nonce = rng.random_range(0..1000) as f64;

        match rng.random_range(0..100) {
            0..=44 => {
                let ts = timestamps.fresh(&mut rng);
                let expected = model.add(&key, ts, nonce);
                let admitted = store.add_block(Block::new(key.clone(), ts, nonce)).unwrap();
                assert_eq!(admitted, expected, "add {} @ {}", key, ts);
            }
            45..=59 => {
                let removed = store.remove_block(&key);
                let expected = model.blocks.remove(&key);
                assert_eq!(removed.is_some(), expected.is_some());
                if let Some(block) = removed {
                    assert!(block.is_removed());
                    assert_eq!(block.key(), key);
                }
            }
            60..=69 => {
                let popped = store.remove_earliest_block().map(|b| b.key().to_string());
                assert_eq!(popped, model.pop());
            }
            70..=84 => {
                let touched = store.update_block(&key, nonce);
                assert_eq!(touched, model.touch(&key, nonce));
                if touched {
                    timestamps.claim(model.max_timestamp);
                    let ts = store.get_block(&key).unwrap().timestamp();
                    assert!(store.iter().all(|b| b.key() == key || b.timestamp() < ts));
                }
            }
            85..=92 => {
                let target = model.earliest().map(|(k, _)| k.clone());
                let touched = store.update_earliest_block(nonce);
                assert_eq!(touched, target.is_some());
                if let Some(target) = target {
                    model.touch(&target, nonce);
                    timestamps.claim(model.max_timestamp);
                }
            }
            _ => {
                let found = store.get_block(&key).map(|b| (b.timestamp(), b.nonce()));
                assert_eq!(found, model.blocks.get(&key).copied());
            }
        }

        check_against_model(&store, &model);
    }
}

#[test]
fn test_random_ops_small_store() {
    for seed in 0..20 {
        run_random_ops(BlockStore::new(4), seed, 400, 8);
    }
}

#[test]
fn test_random_ops_medium_store() {
    for seed in 100..105 {
        run_random_ops(BlockStore::new(64), seed, 3000, 128);
    }
}

#[test]
fn test_random_ops_capacity_one() {
    run_random_ops(BlockStore::new(1), 7, 500, 3);
}

#[test]
fn test_random_ops_polynomial_hasher() {
    run_random_ops(BlockStore::with_hasher(16, PolynomialProber), 42, 2000, 40);
}

/// Every key starts at the same slot and steps by one.
struct Clustered;

impl ProbeHasher for Clustered {
    fn hash1(&self, _key: &str, _table_size: usize) -> usize {
        0
    }

    fn hash2(&self, _key: &str, table_size: usize) -> usize {
        1 % table_size
    }
}

/// Every key gets a zero step, forcing the linear fallback.
struct ZeroStep;

impl ProbeHasher for ZeroStep {
    fn hash1(&self, key: &str, table_size: usize) -> usize {
        key.len() % table_size
    }

    fn hash2(&self, _key: &str, _table_size: usize) -> usize {
        0
    }
}

#[test]
fn test_random_ops_clustered_hasher() {
    run_random_ops(BlockStore::with_hasher(10, Clustered), 3, 2000, 30);
}

#[test]
fn test_random_ops_zero_step_hasher() {
    run_random_ops(BlockStore::with_hasher(10, ZeroStep), 5, 2000, 30);
}

#[test]
fn test_bulk_and_incremental_agree_on_earliest() {
    let mut rng = StdRng::seed_from_u64(11);
    for round in 0..25 {
        let len = rng.random_range(1..60);
        let mut timestamps = Timestamps::new();
        let blocks: Vec<Block> = (0..len)
            .map(|i| Block::new(format!("r{}:{}", round, i), timestamps.fresh(&mut rng), 0.0))
            .collect();

        let bulk = BlockStore::from_blocks(blocks.clone()).unwrap();
        bulk.verify().unwrap();

        let mut sorted = blocks;
        sorted.sort_by_key(|b| b.timestamp());
        let mut incremental = BlockStore::new(len);
        for block in sorted {
            incremental.add_block(block).unwrap();
        }

        assert_eq!(
            bulk.get_earliest_block().map(|b| b.key().to_string()),
            incremental.get_earliest_block().map(|b| b.key().to_string())
        );
    }
}

#[test]
fn test_admission_policy_when_full() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut store = BlockStore::new(16);
    let mut timestamps = Timestamps::new();

    for i in 0..16 {
        let ts = timestamps.fresh(&mut rng);
        store.add_block(Block::new(format!("seed{}", i), ts, 0.0)).unwrap();
    }

    for i in 0..500 {
        let earliest = store.get_earliest_block().unwrap().clone();
        let ts = timestamps.fresh(&mut rng);
        let key = format!("new{}", i);
        let admitted = store.add_block(Block::new(key.clone(), ts, 0.0)).unwrap();

        if ts < earliest.timestamp() {
            assert!(!admitted);
            assert!(store.get_block(earliest.key()).is_some());
            assert!(store.get_block(&key).is_none());
        } else {
            assert!(admitted);
            assert!(store.get_block(earliest.key()).is_none());
            assert!(store.get_block(&key).is_some());
        }
        assert_eq!(store.len(), 16);
        store.verify().unwrap();
    }
}
