//! Digest contract used to place keys into buckets.

use xxhash_rust::xxh3::xxh3_128_with_seed;
use xxhash_rust::xxh32::xxh32;

/// Computes digests of raw key bytes.
///
/// Only `hash32` takes part in bucket selection. `hash128` is a wider slot
/// a table carries along for callers that want it; implementations without
/// a wide variant keep the default.
pub trait HashFunction {
    fn hash32(&self, bytes: &[u8], seed: u32) -> u32;

    fn hash128(&self, bytes: &[u8], seed: u32) -> Option<u128> {
        let _ = (bytes, seed);
        None
    }
}

/// Any `fn(&[u8], u32) -> u32` works as a 32-bit digest.
impl<F> HashFunction for F
where
    F: Fn(&[u8], u32) -> u32,
{
    #[inline]
    fn hash32(&self, bytes: &[u8], seed: u32) -> u32 {
        self(bytes, seed)
    }
}

/// Default digest: xxh32 for indexing, xxh3-128 for the wide slot.
#[derive(Copy, Clone, Debug, Default)]
pub struct XxHash;

impl HashFunction for XxHash {
    #[inline]
    fn hash32(&self, bytes: &[u8], seed: u32) -> u32 {
        xxh32(bytes, seed)
    }

    fn hash128(&self, bytes: &[u8], seed: u32) -> Option<u128> {
        Some(xxh3_128_with_seed(bytes, u64::from(seed)))
    }
}
