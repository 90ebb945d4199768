//! Hashing utilities
//!
//! SPDX-License-Identifier: MIT

const FNV1A_OFFSET_BASIS: u32 = 0x811C9DC5;
const FNV1A_PRIME: u32 = 0x01000193;

/// 32-bit FNV-1a over the UTF-8 bytes of `s`
///
/// Used to bucket string block rows on write. The index field of the key
/// table is not a content hash in shipped resources, so this only yields a
/// consistent layout, not the layout the game itself writes.
#[must_use]
pub fn fnv1a_32(s: &str) -> u32 {
    let mut hash = FNV1A_OFFSET_BASIS;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV1A_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a_32(""), 0x811C9DC5);
        assert_eq!(fnv1a_32("a"), 0xE40C292C);
        assert_eq!(fnv1a_32("foobar"), 0xBF9CF968);
    }

    #[test]
    fn test_fnv1a_is_byte_based() {
        // Multi-byte UTF-8 must hash its encoded bytes, not chars
        assert_ne!(fnv1a_32("é"), fnv1a_32("e"));
        assert_eq!(fnv1a_32("é"), fnv1a_32("\u{e9}"));
    }
}
