//! Prime sizing for the key index.

/// Trial-division primality test using 6k±1 stepping.
pub fn is_prime(n: usize) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Smallest prime greater than or equal to `n`.
pub fn next_prime(n: usize) -> usize {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// Index table size for a store holding `capacity` blocks: the smallest
/// prime at least one larger than the capacity.
#[inline]
pub fn table_size_for(capacity: usize) -> usize {
    next_prime(capacity + 1)
}
