//! Block records and their arena handles.

use std::fmt;

/// Handle to a block's position in the heap's arena.
///
/// Both the heap order array and the key index refer to blocks through this
/// handle, so neither holds a reference into the other. A handle is reused
/// once the block it named has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the block within the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single stored record.
///
/// The key is fixed for the lifetime of the block. The timestamp orders
/// blocks in the heap (smaller is earlier) and the nonce is a freely mutable
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    key: String,
    pub(crate) timestamp: u64,
    pub(crate) nonce: f64,
    pub(crate) heap_index: Option<usize>,
    pub(crate) removed: bool,
}

impl Block {
    /// Create a new block that is not yet part of any store.
    pub fn new(key: impl Into<String>, timestamp: u64, nonce: f64) -> Self {
        Self {
            key: key.into(),
            timestamp,
            nonce,
            heap_index: None,
            removed: false,
        }
    }

    /// The block's key.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The ordering timestamp. Larger is newer.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The payload.
    #[inline]
    pub fn nonce(&self) -> f64 {
        self.nonce
    }

    /// Replace the payload without affecting ordering.
    #[inline]
    pub fn set_nonce(&mut self, nonce: f64) {
        self.nonce = nonce;
    }

    /// Current position in the heap array, `None` when the block is not live.
    #[inline]
    pub fn heap_index(&self) -> Option<usize> {
        self.heap_index
    }

    /// Whether the block has been removed or evicted from a store.
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Mark the block as no longer live.
    pub(crate) fn retire(&mut self) {
        self.heap_index = None;
        self.removed = true;
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} timestamp={} nonce={}",
            self.key, self.timestamp, self.nonce
        )
    }
}
