//! The block store: a timestamp heap and a key index kept in lock-step.

use std::fmt;

use ahash::AHashSet;

use crate::block::Block;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::hasher::{AHashProber, Hashing, ProbeHasher};
use crate::heap::{Admission, BlockHeap};
use crate::index::BlockIndex;
use crate::prime::table_size_for;
use crate::verifier::{StoreVerifier, Violation};

/// Capacity used by [`BlockStoreBuilder`] when none is given.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fixed-capacity block store.
///
/// Every live block is reachable by key through the index and by age through
/// the heap. When the store is full, admitting a block evicts the earliest
/// one; a block older than the earliest is turned away instead.
///
/// The index is sized once, to the smallest prime above the capacity, and
/// never resized.
pub struct BlockStore<H = AHashProber> {
    heap: BlockHeap,
    index: BlockIndex,
    hasher: H,
}

impl BlockStore<AHashProber> {
    /// Create an empty store holding at most `capacity` blocks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`BlockStore::builder`] to get an
    /// error instead.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, AHashProber::new())
    }

    /// Build a full store from an initial set of blocks.
    ///
    /// The capacity is the number of blocks given. The heap is built in
    /// O(n) and each block is then indexed.
    pub fn from_blocks(blocks: Vec<Block>) -> StoreResult<Self> {
        Self::from_blocks_with_hasher(blocks, AHashProber::new())
    }

    /// Start building a store.
    pub fn builder() -> BlockStoreBuilder {
        BlockStoreBuilder::new()
    }
}

impl BlockStore<Hashing> {
    /// Create an empty store from configuration.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        BlockStore::builder()
            .capacity(config.capacity)
            .hasher(config.hasher.build())
            .build()
    }
}

impl<H: ProbeHasher> BlockStore<H> {
    /// Create an empty store using the given hash-function pair.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_hasher(capacity: usize, hasher: H) -> Self {
        let heap = BlockHeap::new(capacity);
        let index = BlockIndex::new(table_size_for(capacity));

        Self {
            heap,
            index,
            hasher,
        }
    }

    /// Build a full store from an initial set of blocks using the given
    /// hash-function pair.
    pub fn from_blocks_with_hasher(blocks: Vec<Block>, hasher: H) -> StoreResult<Self> {
        if blocks.is_empty() {
            return Err(StoreError::InvalidCapacity);
        }

        let mut seen = AHashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.key()) {
                return Err(StoreError::DuplicateKey(block.key().to_string()));
            }
        }
        drop(seen);

        let heap = BlockHeap::from_blocks(blocks);
        let mut index = BlockIndex::new(table_size_for(heap.capacity()));

        for position in 0..heap.len() {
            let Some(id) = heap.id_at(position) else {
                continue;
            };
            let Some(block) = heap.get(id) else {
                continue;
            };
            let slot = index
                .probe(block.key(), true, &hasher)
                .ok_or_else(|| StoreError::IndexExhausted {
                    key: block.key().to_string(),
                })?;
            index.insert_at(slot, block.key(), id);
        }

        tracing::debug!(
            capacity = heap.capacity(),
            table_size = index.table_size(),
            "built block store from initial blocks"
        );

        Ok(Self {
            heap,
            index,
            hasher,
        })
    }

    /// Admit a block.
    ///
    /// Returns `Ok(false)` without touching the store if it is full and the
    /// block is older than the current earliest block. Otherwise the earliest
    /// block is evicted when needed and the new block is admitted.
    ///
    /// A block whose key is already live replaces the existing block.
    pub fn add_block(&mut self, block: Block) -> StoreResult<bool> {
        if self.heap.is_full() {
            if let Some(earliest) = self.heap.peek_earliest() {
                if block.timestamp() < earliest.timestamp() {
                    tracing::trace!(
                        key = block.key(),
                        timestamp = block.timestamp(),
                        earliest = earliest.timestamp(),
                        "rejected block older than earliest"
                    );
                    return Ok(false);
                }
            }
        }

        if let Some(previous) = self.remove_block(block.key()) {
            tracing::debug!(
                key = previous.key(),
                timestamp = previous.timestamp(),
                "replacing live block with the same key"
            );
        }

        if self.heap.is_full() {
            if let Some(evicted) = self.remove_earliest_block() {
                tracing::debug!(
                    key = evicted.key(),
                    timestamp = evicted.timestamp(),
                    "evicted earliest block"
                );
            }
        }

        let slot = self
            .index
            .probe(block.key(), true, &self.hasher)
            .ok_or_else(|| StoreError::IndexExhausted {
                key: block.key().to_string(),
            })?;

        tracing::trace!(
            key = block.key(),
            timestamp = block.timestamp(),
            slot,
            "admitting block"
        );

        let id = match self.heap.insert(block) {
            Admission::Appended(id) => id,
            Admission::Replaced { id, evicted } => {
                if let Some((evicted_slot, _)) = self.index.lookup(evicted.key(), &self.hasher) {
                    self.index.tombstone(evicted_slot);
                }
                id
            }
            Admission::Rejected(_) => return Ok(false),
        };

        if let Some(block) = self.heap.get(id) {
            self.index.insert_at(slot, block.key(), id);
        }

        Ok(true)
    }

    /// Look up a live block by key.
    pub fn get_block(&self, key: &str) -> Option<&Block> {
        let (_, id) = self.index.lookup(key, &self.hasher)?;
        self.heap.get(id)
    }

    /// The block with the smallest timestamp.
    pub fn get_earliest_block(&self) -> Option<&Block> {
        self.heap.peek_earliest()
    }

    /// Remove a block by key, returning it.
    pub fn remove_block(&mut self, key: &str) -> Option<Block> {
        let (slot, id) = self.index.lookup(key, &self.hasher)?;
        let position = self.heap.get(id)?.heap_index()?;
        let block = self.heap.remove_at(position)?;
        self.index.tombstone(slot);

        tracing::trace!(key, timestamp = block.timestamp(), "removed block");
        Some(block)
    }

    /// Remove and return the block with the smallest timestamp.
    pub fn remove_earliest_block(&mut self) -> Option<Block> {
        let block = self.heap.pop_earliest()?;
        if let Some((slot, _)) = self.index.lookup(block.key(), &self.hasher) {
            self.index.tombstone(slot);
        }

        tracing::trace!(
            key = block.key(),
            timestamp = block.timestamp(),
            "removed earliest block"
        );
        Some(block)
    }

    /// Touch a block by key: set its nonce and make it the newest block.
    ///
    /// Returns `false` if the key is not live.
    pub fn update_block(&mut self, key: &str, nonce: f64) -> bool {
        let Some((_, id)) = self.index.lookup(key, &self.hasher) else {
            return false;
        };
        let Some(position) = self.heap.get(id).and_then(Block::heap_index) else {
            return false;
        };

        match self.heap.touch_at(position, nonce) {
            Some(timestamp) => {
                tracing::trace!(key, timestamp, "touched block");
                true
            }
            None => false,
        }
    }

    /// Touch the earliest block: set its nonce and make it the newest block.
    ///
    /// Returns `false` if the store is empty.
    pub fn update_earliest_block(&mut self, nonce: f64) -> bool {
        match self.heap.touch_at(0, nonce) {
            Some(timestamp) => {
                tracing::trace!(timestamp, "touched earliest block");
                true
            }
            None => false,
        }
    }

    /// Number of live blocks.
    #[inline]
    pub fn length(&self) -> usize {
        self.heap.len()
    }

    /// Number of live blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the store holds no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether admitting a block would require an eviction.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.is_full()
    }

    /// Maximum number of live blocks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.heap.capacity()
    }

    /// Number of slots in the key index.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.index.table_size()
    }

    /// Number of tombstoned index slots.
    #[inline]
    pub fn tombstones(&self) -> usize {
        self.index.tombstones()
    }

    /// Highest timestamp the store has ever seen.
    #[inline]
    pub fn max_timestamp(&self) -> u64 {
        self.heap.max_timestamp()
    }

    /// Whether `key` names a live block.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.lookup(key, &self.hasher).is_some()
    }

    /// Iterate over live blocks in heap-array order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.heap.iter()
    }

    /// Check that the heap and the index agree and are internally ordered.
    pub fn verify(&self) -> Result<(), Violation> {
        StoreVerifier::new(&self.heap, &self.index, &self.hasher).verify()
    }
}

impl<H> fmt::Debug for BlockStore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStore")
            .field("len", &self.heap.len())
            .field("capacity", &self.heap.capacity())
            .field("table_size", &self.index.table_size())
            .field("tombstones", &self.index.tombstones())
            .field("max_timestamp", &self.heap.max_timestamp())
            .finish()
    }
}

/// Builder for [`BlockStore`].
pub struct BlockStoreBuilder<H = AHashProber> {
    capacity: usize,
    hasher: H,
}

impl Default for BlockStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStoreBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            hasher: AHashProber::new(),
        }
    }
}

impl<H: ProbeHasher> BlockStoreBuilder<H> {
    /// Set the maximum number of live blocks (default 1024).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Use a different hash-function pair for the key index.
    pub fn hasher<T: ProbeHasher>(self, hasher: T) -> BlockStoreBuilder<T> {
        BlockStoreBuilder {
            capacity: self.capacity,
            hasher,
        }
    }

    /// Build the store.
    pub fn build(self) -> StoreResult<BlockStore<H>> {
        if self.capacity == 0 || self.capacity > u32::MAX as usize {
            return Err(StoreError::InvalidCapacity);
        }
        Ok(BlockStore::with_hasher(self.capacity, self.hasher))
    }
}
