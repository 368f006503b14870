//! Integer mixers shared by every hashcode implementation.

/// Folds a 64-bit key into a well-distributed 32-bit hash.
#[inline]
pub fn hash_64(key: u64) -> u32 {
    let mut key = (!key).wrapping_add(key << 18);
    key ^= key >> 31;
    key = key.wrapping_mul(21);
    key ^= key >> 11;
    key = key.wrapping_add(key << 6);
    key ^= key >> 22;
    key as u32
}

/// Combines two 32-bit hashes into one.
#[inline]
pub fn mix_32(a: u32, b: u32) -> u32 {
    hash_64(((a as u64) << 32) | b as u64)
}
