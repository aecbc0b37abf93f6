//! Open-addressing key index.
//!
//! Maps block keys to [`BlockId`] handles using a fixed, prime-sized table.
//!
//! # Probing
//!
//! Candidate slots follow the double-hashing sequence
//! `(h1 + k * h2) mod table_size`. If that sequence comes back around to its
//! starting slot without settling, probing restarts from `h1` and walks
//! linearly, `(h1 + k) mod table_size`, for at most one full lap.
//!
//! # Deletion
//!
//! Removed keys leave a tombstone behind. Lookups walk past tombstones;
//! inserts reclaim the first one they meet. Tombstones are never compacted
//! and the table is never resized.

use crate::block::BlockId;
use crate::hasher::ProbeHasher;

/// State of one index slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Never used. Terminates lookups.
    Empty,
    /// Previously used. Skipped by lookups, reclaimable by inserts.
    Tombstone,
    /// Holds a live block.
    Occupied {
        /// Key of the block.
        key: Box<str>,
        /// Handle of the block in the heap arena.
        id: BlockId,
    },
}

/// What a probe is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Insert,
    Lookup,
}

/// Result of examining a single slot during a probe.
enum Step {
    /// Probe ends at this slot.
    Settle(usize),
    /// Probe ends without a usable slot.
    Miss,
    /// Keep walking.
    Continue,
}

/// Fixed-size open-addressing table of block handles.
pub struct BlockIndex {
    slots: Vec<Slot>,
    live: usize,
    tombstones: usize,
}

impl BlockIndex {
    /// Create an index with `table_size` empty slots.
    pub fn new(table_size: usize) -> Self {
        assert!(table_size > 0, "table size must be positive");

        let mut slots = Vec::with_capacity(table_size);
        slots.resize(table_size, Slot::Empty);

        Self {
            slots,
            live: 0,
            tombstones: 0,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of tombstoned slots.
    #[inline]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Inspect a slot.
    #[inline]
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Iterate over `(slot, key, id)` for every occupied slot.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &str, BlockId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Occupied { key, id } => Some((i, key.as_ref(), *id)),
                _ => None,
            })
    }

    /// Walk the probe sequence for `key`.
    ///
    /// With `for_insert` set, returns the slot an insert should use: the
    /// first empty or tombstoned slot, or the slot already holding `key`.
    /// `None` means the table has no usable slot for this key.
    ///
    /// Without `for_insert`, returns the slot holding `key`, or `None` if the
    /// key is absent.
    pub fn probe<H: ProbeHasher>(&self, key: &str, for_insert: bool, hasher: &H) -> Option<usize> {
        let intent = if for_insert {
            Intent::Insert
        } else {
            Intent::Lookup
        };

        let table_size = self.slots.len();
        let h1 = hasher.hash1(key, table_size) % table_size;
        let h2 = hasher.hash2(key, table_size) % table_size;

        let mut index = h1;
        loop {
            match self.examine(index, key, intent) {
                Step::Settle(slot) => return Some(slot),
                Step::Miss => return None,
                Step::Continue => {}
            }

            index = (index + h2) % table_size;
            if index == h1 {
                break;
            }
        }

        tracing::debug!(key, table_size, step = h2, "double hashing cycled, probing linearly");

        for k in 0..table_size {
            match self.examine((h1 + k) % table_size, key, intent) {
                Step::Settle(slot) => return Some(slot),
                Step::Miss => return None,
                Step::Continue => {}
            }
        }

        None
    }

    /// Find the slot and handle for a live key.
    pub fn lookup<H: ProbeHasher>(&self, key: &str, hasher: &H) -> Option<(usize, BlockId)> {
        let index = self.probe(key, false, hasher)?;
        match &self.slots[index] {
            Slot::Occupied { id, .. } => Some((index, *id)),
            _ => None,
        }
    }

    /// Store `key` at `index`, overwriting whatever the slot held.
    pub fn insert_at(&mut self, index: usize, key: &str, id: BlockId) {
        let previous = std::mem::replace(
            &mut self.slots[index],
            Slot::Occupied {
                key: key.into(),
                id,
            },
        );

        match previous {
            Slot::Empty => self.live += 1,
            Slot::Tombstone => {
                self.tombstones -= 1;
                self.live += 1;
            }
            Slot::Occupied { .. } => {}
        }
    }

    /// Tombstone an occupied slot, returning the handle it held.
    pub fn tombstone(&mut self, index: usize) -> Option<BlockId> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Tombstone) {
            Slot::Occupied { id, .. } => {
                self.live -= 1;
                self.tombstones += 1;
                Some(id)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    #[inline]
    fn examine(&self, index: usize, key: &str, intent: Intent) -> Step {
        match (&self.slots[index], intent) {
            (Slot::Empty, Intent::Insert) => Step::Settle(index),
            (Slot::Empty, Intent::Lookup) => Step::Miss,
            (Slot::Tombstone, Intent::Insert) => Step::Settle(index),
            (Slot::Tombstone, Intent::Lookup) => Step::Continue,
            (Slot::Occupied { key: stored, .. }, _) if stored.as_ref() == key => {
                Step::Settle(index)
            }
            (Slot::Occupied { .. }, _) => Step::Continue,
        }
    }
}
