//! Error types for block store operations.
//!
//! Expected outcomes (a rejected admission, a missing key, an empty store)
//! are reported through `bool` and `Option` results. The variants here cover
//! invalid construction and broken internal bookkeeping.

/// Errors that can occur constructing or mutating a block store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Capacity must be at least one block.
    #[error("capacity must be positive")]
    InvalidCapacity,

    /// The same key appeared more than once in an initial block set.
    #[error("duplicate key in initial blocks: {0}")]
    DuplicateKey(String),

    /// Probing cycled through the whole index without a usable slot.
    ///
    /// The index always has more slots than the store has capacity, so this
    /// means heap and index bookkeeping have diverged.
    #[error("key index exhausted while inserting {key}")]
    IndexExhausted {
        /// Key being inserted.
        key: String,
    },
}

/// Result type for block store operations.
pub type StoreResult<T> = Result<T, StoreError>;
