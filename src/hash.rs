use crate::AffinityKey;
use std::hash::Hasher;

/// 64-bit avalanche finalizer (three xor-shift rounds around two odd multipliers).
///
/// Sequential or clustered keys come out spread across the whole 64-bit range,
/// so reducing modulo the bucket count keeps chains short. Not cryptographic.
#[inline]
pub const fn mix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Bucket index of `key` for a table of `capacity` buckets, in `[0, capacity)`.
///
/// Only valid for that exact capacity; every index changes after a resize.
///
/// # Panics
///
/// Panics if `capacity` is 0.
#[inline]
pub fn hash(key: AffinityKey, capacity: usize) -> usize {
    reduce(mix64(key as u64), capacity)
}

/// Reduce a full 64-bit hash to a bucket index.
#[inline]
pub(crate) fn reduce(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

/// Hash function implementation for bucket selection.
/// Uses an enum so the table stays a concrete, non-generic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyHasher {
    /// Avalanche mix of the key's unsigned bit pattern (default).
    #[default]
    Mix64,
    /// AHash with fixed keys.
    AHash,
    /// FxHash implementation (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

impl KeyHasher {
    /// Hash a key to a full 64-bit value. Deterministic for a given build.
    #[inline]
    pub fn hash_key(&self, key: AffinityKey) -> u64 {
        match self {
            KeyHasher::Mix64 => mix64(key as u64),
            KeyHasher::AHash => {
                let mut hasher = ahash::AHasher::default();
                hasher.write_i64(key);
                hasher.finish()
            }
            #[cfg(feature = "fxhash")]
            KeyHasher::FxHash => {
                let mut hasher = fxhash::FxHasher::default();
                hasher.write_i64(key);
                hasher.finish()
            }
        }
    }

    /// Bucket index of `key` for a table of `capacity` buckets.
    #[inline]
    pub fn bucket_index(&self, key: AffinityKey, capacity: usize) -> usize {
        reduce(self.hash_key(key), capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix64_is_deterministic() {
        assert_eq!(mix64(42), mix64(42));
        assert_ne!(mix64(42), mix64(43));
        assert_eq!(mix64(0), 0);
    }

    #[test]
    fn test_negative_keys_use_bit_pattern() {
        assert_eq!(hash(-1, 1024), reduce(mix64(u64::MAX), 1024));
        assert!(hash(i64::MIN, 7) < 7);
    }

    #[test]
    fn test_index_in_range() {
        for capacity in [1, 2, 3, 8, 17, 1024, 20480] {
            for key in -500..500 {
                assert!(hash(key, capacity) < capacity);
                assert!(KeyHasher::AHash.bucket_index(key, capacity) < capacity);
            }
        }
    }

    #[test]
    fn test_hashers_are_stable() {
        for hasher in [KeyHasher::Mix64, KeyHasher::AHash] {
            assert_eq!(hasher.hash_key(99_999_999_999), hasher.hash_key(99_999_999_999));
        }
        assert_eq!(KeyHasher::Mix64.bucket_index(1001, 8), hash(1001, 8));
    }

    #[test]
    fn test_sequential_keys_spread() {
        let capacity = 64;
        let mut counts = vec![0usize; capacity];
        for key in 0..(capacity as i64 * 64) {
            counts[hash(key, capacity)] += 1;
        }
        // 64 expected per bucket.
        let max = *counts.iter().max().unwrap();
        let min = *counts.iter().min().unwrap();
        assert!(max < 128, "max bucket load {max}");
        assert!(min > 16, "min bucket load {min}");
    }

    #[test]
    fn test_strided_keys_spread() {
        // Multiples of the capacity would all land in bucket 0 without mixing.
        let capacity = 16;
        let used: std::collections::HashSet<usize> =
            (0..256).map(|i| hash(i * capacity as i64, capacity)).collect();
        assert!(used.len() > capacity / 2);
    }
}
