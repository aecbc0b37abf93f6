//! Fixed-capacity, timestamp-ordered block store.
//!
//! A [`BlockStore`] keeps a bounded set of [`Block`]s reachable two ways: by
//! age, through a binary min-heap on timestamp, and by key, through an
//! open-addressing index with double hashing. Both structures are updated
//! together on every mutation.
//!
//! # Architecture
//!
//! ```text
//! +------------------------------------------+
//! |               BlockStore                 |
//! |                                          |
//! |  +------------------------------------+  |
//! |  | BlockIndex                         |  |
//! |  | - prime-sized slot table           |  |
//! |  | - key -> BlockId                   |  |
//! |  | - double hashing, linear fallback  |  |
//! |  | - tombstones on delete             |  |
//! |  +------------------------------------+  |
//! |        |                                 |
//! |        v                                 |
//! |  +------------------------------------+  |
//! |  | BlockHeap                          |  |
//! |  | - arena: Vec<Option<Block>>        |  |
//! |  | - order: Vec<BlockId> (min-heap)   |  |
//! |  | - max timestamp                    |  |
//! |  +------------------------------------+  |
//! +------------------------------------------+
//! ```
//!
//! # Admission
//!
//! While the store has room every block is admitted. Once full, a block at
//! least as new as the earliest block evicts it; an older block is rejected
//! and the store is left unchanged.
//!
//! # Touch
//!
//! [`BlockStore::update_block`] and [`BlockStore::update_earliest_block`]
//! replace a block's nonce and move it to the back of the line by giving it a
//! timestamp one past the newest ever seen.
//!
//! # Example
//!
//! ```
//! use blockheap::{Block, BlockStore};
//!
//! let mut store = BlockStore::new(2);
//! assert!(store.add_block(Block::new("a", 5, 0.0)).unwrap());
//! assert!(store.add_block(Block::new("b", 3, 0.0)).unwrap());
//! assert_eq!(store.get_earliest_block().unwrap().key(), "b");
//!
//! // older than the earliest block while full
//! assert!(!store.add_block(Block::new("c", 1, 0.0)).unwrap());
//!
//! // evicts "b"
//! assert!(store.add_block(Block::new("d", 10, 0.0)).unwrap());
//! assert!(store.get_block("b").is_none());
//! ```
//!
//! # Thread Safety
//!
//! None. Callers sharing a store across threads must guard the whole store
//! with a single lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod error;
mod heap;
mod index;
mod prime;
mod store;
mod verifier;

pub mod command;
pub mod config;
pub mod hasher;
pub mod logging;

pub use block::{Block, BlockId};
pub use error::{StoreError, StoreResult};
pub use hasher::{AHashProber, HasherKind, Hashing, PolynomialProber, ProbeHasher};
pub use heap::{Admission, BlockHeap};
pub use index::{BlockIndex, Slot};
pub use prime::{is_prime, next_prime, table_size_for};
pub use store::{BlockStore, BlockStoreBuilder, DEFAULT_CAPACITY};
pub use verifier::{StoreVerifier, Violation};
