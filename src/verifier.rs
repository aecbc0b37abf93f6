//! Consistency checks between the heap and the key index.
//!
//! Verifies that every heap position is ordered and self-describing, and
//! that the index holds exactly the live blocks, each reachable by probing
//! for its own key.

use ahash::AHashSet;

use crate::hasher::ProbeHasher;
use crate::heap::BlockHeap;
use crate::index::BlockIndex;

/// A broken invariant found by [`StoreVerifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A heap position names no live block.
    #[error("heap position {position} holds no live block")]
    MissingBlock {
        /// Heap position.
        position: usize,
    },

    /// A block's recorded heap position disagrees with where it sits.
    #[error("block {key} at heap position {position} records position {recorded:?}")]
    StalePosition {
        /// Key of the block.
        key: String,
        /// Actual heap position.
        position: usize,
        /// Position the block believes it is at.
        recorded: Option<usize>,
    },

    /// A live block is marked removed.
    #[error("live block {key} is marked removed")]
    RemovedButLive {
        /// Key of the block.
        key: String,
    },

    /// A parent is newer than one of its children.
    #[error("heap order violated between positions {parent} and {child}")]
    HeapOrder {
        /// Parent position.
        parent: usize,
        /// Child position.
        child: usize,
    },

    /// A live block is newer than the recorded maximum timestamp.
    #[error("block {key} timestamp {timestamp} exceeds max timestamp {max}")]
    TimestampAboveMax {
        /// Key of the block.
        key: String,
        /// Block timestamp.
        timestamp: u64,
        /// Recorded maximum.
        max: u64,
    },

    /// Heap and index disagree on the number of live blocks.
    #[error("heap holds {heap} blocks but index holds {index}")]
    CountMismatch {
        /// Live blocks in the heap.
        heap: usize,
        /// Occupied index slots.
        index: usize,
    },

    /// An index slot refers to a block that is gone or has a different key.
    #[error("index slot {slot} for {key} does not match its block")]
    DanglingSlot {
        /// Index slot.
        slot: usize,
        /// Key stored in the slot.
        key: String,
    },

    /// A key occupies more than one index slot.
    #[error("key {key} is indexed more than once")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// Probing for a key does not arrive at the slot holding it.
    #[error("key {key} in slot {slot} is unreachable by probing")]
    Unreachable {
        /// Key stored in the slot.
        key: String,
        /// Index slot.
        slot: usize,
    },
}

/// Checks heap order and heap/index agreement.
pub struct StoreVerifier<'a, H> {
    heap: &'a BlockHeap,
    index: &'a BlockIndex,
    hasher: &'a H,
}

impl<'a, H: ProbeHasher> StoreVerifier<'a, H> {
    /// Create a verifier over a heap and its index.
    pub fn new(heap: &'a BlockHeap, index: &'a BlockIndex, hasher: &'a H) -> Self {
        Self {
            heap,
            index,
            hasher,
        }
    }

    /// Run every check, stopping at the first violation.
    pub fn verify(&self) -> Result<(), Violation> {
        self.verify_heap()?;
        self.verify_index()
    }

    fn verify_heap(&self) -> Result<(), Violation> {
        let len = self.heap.len();
        let max = self.heap.max_timestamp();

        for position in 0..len {
            let block = self
                .heap
                .id_at(position)
                .and_then(|id| self.heap.get(id))
                .ok_or(Violation::MissingBlock { position })?;

            if block.heap_index() != Some(position) {
                return Err(Violation::StalePosition {
                    key: block.key().to_string(),
                    position,
                    recorded: block.heap_index(),
                });
            }
            if block.is_removed() {
                return Err(Violation::RemovedButLive {
                    key: block.key().to_string(),
                });
            }
            if block.timestamp() > max {
                return Err(Violation::TimestampAboveMax {
                    key: block.key().to_string(),
                    timestamp: block.timestamp(),
                    max,
                });
            }

            if position > 0 {
                let parent = (position - 1) / 2;
                let parent_block = self
                    .heap
                    .id_at(parent)
                    .and_then(|id| self.heap.get(id))
                    .ok_or(Violation::MissingBlock { position: parent })?;
                if parent_block.timestamp() > block.timestamp() {
                    return Err(Violation::HeapOrder {
                        parent,
                        child: position,
                    });
                }
            }
        }

        Ok(())
    }

    fn verify_index(&self) -> Result<(), Violation> {
        if self.index.live() != self.heap.len() {
            return Err(Violation::CountMismatch {
                heap: self.heap.len(),
                index: self.index.live(),
            });
        }

        let mut seen = AHashSet::with_capacity(self.index.live());
        for (slot, key, id) in self.index.occupied() {
            match self.heap.get(id) {
                Some(block) if block.key() == key => {}
                _ => {
                    return Err(Violation::DanglingSlot {
                        slot,
                        key: key.to_string(),
                    });
                }
            }

            if !seen.insert(key) {
                return Err(Violation::DuplicateKey {
                    key: key.to_string(),
                });
            }

            if self.index.probe(key, false, self.hasher) != Some(slot) {
                return Err(Violation::Unreachable {
                    key: key.to_string(),
                    slot,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockId};
    use crate::hasher::AHashProber;

    #[test]
    fn test_empty_is_consistent() {
        let heap = BlockHeap::new(3);
        let index = BlockIndex::new(5);
        let hasher = AHashProber::new();
        assert_eq!(StoreVerifier::new(&heap, &index, &hasher).verify(), Ok(()));
    }

    #[test]
    fn test_unindexed_block_is_a_count_mismatch() {
        let mut heap = BlockHeap::new(3);
        heap.insert(Block::new("a", 1, 0.0));
        let index = BlockIndex::new(5);
        let hasher = AHashProber::new();

        assert_eq!(
            StoreVerifier::new(&heap, &index, &hasher).verify(),
            Err(Violation::CountMismatch { heap: 1, index: 0 })
        );
    }

    #[test]
    fn test_dangling_slot() {
        let heap = BlockHeap::new(3);
        let mut index = BlockIndex::new(5);
        let hasher = AHashProber::new();
        index.insert_at(0, "ghost", BlockId::new(0));

        let mut heap_with_one = heap;
        heap_with_one.insert(Block::new("real", 1, 0.0));

        assert!(matches!(
            StoreVerifier::new(&heap_with_one, &index, &hasher).verify(),
            Err(Violation::DanglingSlot { slot: 0, .. })
        ));
    }

    #[test]
    fn test_misplaced_key_is_unreachable() {
        let mut heap = BlockHeap::new(3);
        heap.insert(Block::new("a", 1, 0.0));
        let mut index = BlockIndex::new(5);
        let hasher = AHashProber::new();

        let home = index.probe("a", true, &hasher).unwrap();
        let wrong = (home + 1) % 5;
        index.insert_at(wrong, "a", BlockId::new(0));

        assert_eq!(
            StoreVerifier::new(&heap, &index, &hasher).verify(),
            Err(Violation::Unreachable {
                key: "a".to_string(),
                slot: wrong
            })
        );
    }
}
