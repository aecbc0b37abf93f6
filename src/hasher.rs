//! Hash-function pairs for double hashing.
//!
//! The key index asks a [`ProbeHasher`] for two independent hash values per
//! key. The first picks the starting slot; the second is the step between
//! probes. Both must be deterministic and fall within `[0, table_size)`.
//! A step of zero is tolerated (probing falls back to linear) but defeats
//! the point of double hashing, so implementations here never return one
//! for tables with more than one slot.

use ahash::RandomState;
use serde::Deserialize;
use std::fmt;

/// Supplies the two hash functions used by the key index.
pub trait ProbeHasher {
    /// Starting slot for `key`, in `[0, table_size)`.
    fn hash1(&self, key: &str, table_size: usize) -> usize;

    /// Probe step for `key`, in `[0, table_size)`.
    fn hash2(&self, key: &str, table_size: usize) -> usize;
}

impl<H: ProbeHasher + ?Sized> ProbeHasher for &H {
    #[inline]
    fn hash1(&self, key: &str, table_size: usize) -> usize {
        (**self).hash1(key, table_size)
    }

    #[inline]
    fn hash2(&self, key: &str, table_size: usize) -> usize {
        (**self).hash2(key, table_size)
    }
}

/// Map a raw hash onto a non-zero step for a table of `table_size` slots.
#[inline]
fn step(hash: u64, table_size: usize) -> usize {
    if table_size <= 1 {
        return 0;
    }
    1 + (hash % (table_size as u64 - 1)) as usize
}

/// ahash-backed hasher pair with fixed seeds.
///
/// Seeds are fixed so that slot placement is reproducible across runs.
#[derive(Clone)]
pub struct AHashProber {
    primary: RandomState,
    secondary: RandomState,
}

impl AHashProber {
    /// Create a hasher pair with the default seeds.
    pub fn new() -> Self {
        Self::with_seeds(0x243f6a8885a308d3, 0x13198a2e03707344)
    }

    /// Create a hasher pair from two seeds.
    pub fn with_seeds(primary: u64, secondary: u64) -> Self {
        Self {
            primary: RandomState::with_seeds(
                primary,
                primary.rotate_left(17),
                0xa4093822299f31d0,
                0x082efa98ec4e6c89,
            ),
            secondary: RandomState::with_seeds(
                secondary,
                secondary.rotate_left(29),
                0x452821e638d01377,
                0xbe5466cf34e90c6c,
            ),
        }
    }
}

impl Default for AHashProber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AHashProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AHashProber").finish_non_exhaustive()
    }
}

impl ProbeHasher for AHashProber {
    #[inline]
    fn hash1(&self, key: &str, table_size: usize) -> usize {
        (self.primary.hash_one(key) % table_size as u64) as usize
    }

    #[inline]
    fn hash2(&self, key: &str, table_size: usize) -> usize {
        step(self.secondary.hash_one(key), table_size)
    }
}

/// Polynomial string hash (base 31) used for both functions.
///
/// Slower to spread than [`AHashProber`] but stable across library versions
/// and easy to reproduce by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolynomialProber;

impl PolynomialProber {
    #[inline]
    fn raw(key: &str) -> u64 {
        key.bytes()
            .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64))
    }
}

impl ProbeHasher for PolynomialProber {
    #[inline]
    fn hash1(&self, key: &str, table_size: usize) -> usize {
        (Self::raw(key) % table_size as u64) as usize
    }

    #[inline]
    fn hash2(&self, key: &str, table_size: usize) -> usize {
        step(Self::raw(key) / table_size as u64, table_size)
    }
}

/// Hasher selection as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// [`AHashProber`] with default seeds.
    #[default]
    AHash,
    /// [`PolynomialProber`].
    Polynomial,
}

impl HasherKind {
    /// Instantiate the selected hasher.
    pub fn build(self) -> Hashing {
        match self {
            HasherKind::AHash => Hashing::AHash(AHashProber::new()),
            HasherKind::Polynomial => Hashing::Polynomial(PolynomialProber),
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HasherKind::AHash => write!(f, "ahash"),
            HasherKind::Polynomial => write!(f, "polynomial"),
        }
    }
}

impl std::str::FromStr for HasherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ahash" => Ok(HasherKind::AHash),
            "polynomial" => Ok(HasherKind::Polynomial),
            other => Err(format!("unknown hasher '{}'", other)),
        }
    }
}

/// A hasher chosen at runtime.
#[derive(Debug, Clone)]
pub enum Hashing {
    /// Seeded ahash pair.
    AHash(AHashProber),
    /// Base-31 polynomial hash.
    Polynomial(PolynomialProber),
}

impl ProbeHasher for Hashing {
    #[inline]
    fn hash1(&self, key: &str, table_size: usize) -> usize {
        match self {
            Hashing::AHash(h) => h.hash1(key, table_size),
            Hashing::Polynomial(h) => h.hash1(key, table_size),
        }
    }

    #[inline]
    fn hash2(&self, key: &str, table_size: usize) -> usize {
        match self {
            Hashing::AHash(h) => h.hash2(key, table_size),
            Hashing::Polynomial(h) => h.hash2(key, table_size),
        }
    }
}
