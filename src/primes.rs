//! Capacity sizing policy: every table capacity is a prime.
//!
//! Small and medium capacities come from a curated ascending table whose
//! entries grow by roughly 1.2x; beyond it the next odd prime is found by
//! trial division.

use thiserror::Error;

/// Largest capacity `expand_prime` proposes on its own. Doubling past this
/// value is clamped to it once; growing beyond it requires an explicit
/// request through `get_prime`.
pub const MAX_EXPANDED_CAPACITY: usize = 2_146_435_069;

const PRIMES: &[usize] = &[
    3, 7, 17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631, 761,
    919, 1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103, 12143,
    14591, 17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631, 130363,
    156437, 187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403, 968897,
    1162687, 1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559, 5999471,
    7199369,
];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// No prime at or above `requested` is representable as `usize`.
    #[error("no prime capacity of at least {requested} fits in usize")]
    Exhausted { requested: usize },
}

/// Trial division by odd candidates up to the square root.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n & 1 == 0 {
        return n == 2;
    }
    let mut divisor = 3;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Smallest supported capacity that is `>= min`.
pub fn get_prime(min: usize) -> Result<usize, CapacityError> {
    if let Some(&prime) = PRIMES.iter().find(|&&p| p >= min) {
        return Ok(prime);
    }

    log::trace!("capacity {min} exceeds the curated primes; searching by trial division");
    let mut candidate = min | 1;
    while candidate < usize::MAX {
        if is_prime(candidate) {
            return Ok(candidate);
        }
        candidate = match candidate.checked_add(2) {
            Some(next) => next,
            None => break,
        };
    }
    Err(CapacityError::Exhausted { requested: min })
}

/// Next capacity after `current`: about twice as large, rounded up to a
/// supported prime and clamped to `MAX_EXPANDED_CAPACITY`.
pub fn expand_prime(current: usize) -> Result<usize, CapacityError> {
    let proposed = current.saturating_mul(2);
    if current < MAX_EXPANDED_CAPACITY && MAX_EXPANDED_CAPACITY < proposed {
        return Ok(MAX_EXPANDED_CAPACITY);
    }
    get_prime(proposed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_table_is_ascending_primes() {
        assert!(PRIMES.windows(2).all(|w| w[0] < w[1]));
        for &p in PRIMES {
            assert!(is_prime(p), "{p} is not prime");
        }
        assert!(is_prime(MAX_EXPANDED_CAPACITY));
    }

    #[test]
    fn small_numbers() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(9));
        assert!(!is_prime(25));
        assert!(is_prime(10_000_019));
    }

    #[test]
    fn get_prime_rounds_up_within_curated_table() {
        assert_eq!(get_prime(0), Ok(3));
        assert_eq!(get_prime(3), Ok(3));
        assert_eq!(get_prime(4), Ok(7));
        assert_eq!(get_prime(100), Ok(107));
        assert_eq!(get_prime(7_199_369), Ok(7_199_369));
    }

    #[test]
    fn get_prime_searches_past_curated_table() {
        assert_eq!(get_prime(7_199_370), Ok(7_199_371));
        assert_eq!(get_prime(10_000_000), Ok(10_000_019));
    }

    #[test]
    fn get_prime_reports_exhaustion() {
        assert_eq!(
            get_prime(usize::MAX),
            Err(CapacityError::Exhausted {
                requested: usize::MAX
            })
        );
        assert!(get_prime(usize::MAX - 1).is_err());
    }

    #[test]
    fn expand_roughly_doubles() {
        assert_eq!(expand_prime(3), Ok(7));
        assert_eq!(expand_prime(7), Ok(17));
        assert_eq!(expand_prime(17), Ok(37));
        assert_eq!(expand_prime(3_471_899), Ok(7_199_369));
    }

    #[test]
    fn expand_clamps_to_max_once() {
        assert_eq!(expand_prime(1_500_000_000), Ok(MAX_EXPANDED_CAPACITY));
        assert_eq!(expand_prime(MAX_EXPANDED_CAPACITY - 1), Ok(MAX_EXPANDED_CAPACITY));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn expand_past_max_keeps_doubling() {
        assert_eq!(expand_prime(MAX_EXPANDED_CAPACITY), Ok(4_292_870_147));
    }

    #[test]
    fn expand_overflow_is_exhaustion() {
        assert!(expand_prime(usize::MAX / 2 + 1).is_err());
    }
}
