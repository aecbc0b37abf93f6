//! Fixed-capacity min-heap of blocks ordered by timestamp.
//!
//! # Design
//!
//! - Blocks live in an arena (`Vec<Option<Block>>`) sized to the capacity
//! - The heap order array holds [`BlockId`] handles into the arena
//! - Every block records its own heap position, updated on each swap
//! - Vacant arena positions are kept on a free list and reused
//!
//! The heap also tracks the largest timestamp it has ever seen, which is
//! used to hand out strictly increasing timestamps when a block is touched.

use crate::block::{Block, BlockId};

/// Outcome of [`BlockHeap::insert`].
#[derive(Debug)]
pub enum Admission {
    /// The heap had room and the block was appended.
    Appended(BlockId),
    /// The heap was full and the block replaced the earliest block.
    Replaced {
        /// Handle now naming the inserted block.
        id: BlockId,
        /// The displaced earliest block.
        evicted: Block,
    },
    /// The heap was full and the block was not newer than the earliest.
    Rejected(Block),
}

impl Admission {
    /// Whether the block made it into the heap.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Rejected(_))
    }
}

/// Array-backed binary min-heap over block timestamps.
pub struct BlockHeap {
    /// Block storage indexed by `BlockId`.
    arena: Vec<Option<Block>>,
    /// Vacant arena positions.
    free: Vec<BlockId>,
    /// Heap array. `order.len()` is the number of live blocks.
    order: Vec<BlockId>,
    /// Highest timestamp ever observed.
    max_timestamp: u64,
}

impl BlockHeap {
    /// Create an empty heap that holds at most `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        assert!(
            capacity <= u32::MAX as usize,
            "capacity exceeds maximum block index"
        );

        let mut arena = Vec::with_capacity(capacity);
        arena.resize_with(capacity, || None);

        Self {
            arena,
            free: (0..capacity).rev().map(BlockId::new).collect(),
            order: Vec::with_capacity(capacity),
            max_timestamp: 0,
        }
    }

    /// Build a full heap from an initial set of blocks in O(n).
    ///
    /// Blocks are placed in input order and then heapified bottom-up. The
    /// capacity is the number of blocks given.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let capacity = blocks.len();
        assert!(capacity > 0, "capacity must be positive");
        assert!(
            capacity <= u32::MAX as usize,
            "capacity exceeds maximum block index"
        );

        let mut max_timestamp = 0;
        let mut arena = Vec::with_capacity(capacity);
        let mut order = Vec::with_capacity(capacity);

        for (i, mut block) in blocks.into_iter().enumerate() {
            max_timestamp = max_timestamp.max(block.timestamp);
            block.heap_index = Some(i);
            block.removed = false;
            arena.push(Some(block));
            order.push(BlockId::new(i));
        }

        let mut heap = Self {
            arena,
            free: Vec::new(),
            order,
            max_timestamp,
        };

        for i in (0..capacity / 2).rev() {
            heap.sift_down(i);
        }

        heap
    }

    /// Number of live blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the heap holds no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether the heap is at capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.order.len() >= self.arena.len()
    }

    /// Maximum number of live blocks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Highest timestamp the heap has ever observed.
    #[inline]
    pub fn max_timestamp(&self) -> u64 {
        self.max_timestamp
    }

    /// Look up a live block by handle.
    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.arena.get(id.index()).and_then(Option::as_ref)
    }

    /// Handle of the block at heap position `index`.
    #[inline]
    pub fn id_at(&self, index: usize) -> Option<BlockId> {
        self.order.get(index).copied()
    }

    /// Iterate over live blocks in heap-array order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    /// Insert a block.
    ///
    /// With room available the block is appended and sifted up. When full,
    /// a block strictly newer than the root replaces the root; anything else
    /// is rejected and handed back. The maximum timestamp is updated either
    /// way.
    pub fn insert(&mut self, mut block: Block) -> Admission {
        self.max_timestamp = self.max_timestamp.max(block.timestamp);
        block.removed = false;

        if !self.is_full() {
            let Some(id) = self.free.pop() else {
                return Admission::Rejected(block);
            };
            let index = self.order.len();
            block.heap_index = Some(index);
            self.arena[id.index()] = Some(block);
            self.order.push(id);
            self.sift_up(index);
            return Admission::Appended(id);
        }

        let Some(id) = self.id_at(0) else {
            return Admission::Rejected(block);
        };
        if block.timestamp <= self.timestamp_at(0) {
            block.heap_index = None;
            return Admission::Rejected(block);
        }

        block.heap_index = Some(0);
        let previous = self.arena[id.index()].replace(block);
        self.sift_down(0);

        match previous {
            Some(mut evicted) => {
                evicted.retire();
                Admission::Replaced { id, evicted }
            }
            None => Admission::Appended(id),
        }
    }

    /// The earliest block, if any.
    pub fn peek_earliest(&self) -> Option<&Block> {
        self.id_at(0).and_then(|id| self.get(id))
    }

    /// Remove and return the earliest block.
    pub fn pop_earliest(&mut self) -> Option<Block> {
        let block = self.take_at(0)?;
        self.sift_down(0);
        Some(block)
    }

    /// Remove the block at heap position `index`.
    ///
    /// The last block is moved into the hole and repaired in place.
    pub fn remove_at(&mut self, index: usize) -> Option<Block> {
        let block = self.take_at(index)?;
        self.repair(index);
        Some(block)
    }

    /// Touch the block at heap position `index`: set its nonce and make it the
    /// newest block. Returns the new timestamp, or `None` if the position is
    /// not live.
    pub fn touch_at(&mut self, index: usize, nonce: f64) -> Option<u64> {
        let id = self.id_at(index)?;
        let timestamp = self.max_timestamp.saturating_add(1);

        let block = self.arena[id.index()].as_mut()?;
        block.nonce = nonce;
        block.timestamp = timestamp;
        self.max_timestamp = timestamp;

        self.repair(index);
        Some(timestamp)
    }

    /// Restore heap order around a position whose block just changed.
    ///
    /// Only one block changed, so it can only be out of order against its
    /// children or against its parent, never both.
    fn repair(&mut self, index: usize) {
        let len = self.order.len();
        if index >= len {
            return;
        }

        let timestamp = self.timestamp_at(index);
        let left = 2 * index + 1;
        let right = 2 * index + 2;

        if (left < len && timestamp > self.timestamp_at(left))
            || (right < len && timestamp > self.timestamp_at(right))
        {
            self.sift_down(index);
        } else if index > 0 && timestamp < self.timestamp_at((index - 1) / 2) {
            self.sift_up(index);
        }
    }

    /// Swap-remove the block at `index` and return it retired. Heap order is
    /// left for the caller to restore.
    fn take_at(&mut self, index: usize) -> Option<Block> {
        if index >= self.order.len() {
            return None;
        }

        let id = self.order.swap_remove(index);
        if let Some(&moved) = self.order.get(index) {
            self.set_position(moved, index);
        }

        let mut block = self.arena[id.index()].take()?;
        self.free.push(id);
        block.retire();
        Some(block)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.timestamp_at(index) < self.timestamp_at(parent) {
                self.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.order.len();
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut smallest = index;

            if left < len && self.timestamp_at(left) < self.timestamp_at(smallest) {
                smallest = left;
            }
            if right < len && self.timestamp_at(right) < self.timestamp_at(smallest) {
                smallest = right;
            }

            if smallest == index {
                break;
            }

            self.swap(index, smallest);
            index = smallest;
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
        self.set_position(self.order[a], a);
        self.set_position(self.order[b], b);
    }

    #[inline]
    fn set_position(&mut self, id: BlockId, index: usize) {
        if let Some(block) = self.arena[id.index()].as_mut() {
            block.heap_index = Some(index);
        }
    }

    #[inline]
    fn timestamp_at(&self, index: usize) -> u64 {
        self.get(self.order[index]).map_or(u64::MAX, Block::timestamp)
    }
}
