//! Bit-level framing helpers shared by the embedding codecs.
//!
//! All payloads travel as MSB-first bit expansions of their bytes.

/// Expands bytes into 0/1 bit values, MSB first.
pub fn push_bits(bytes: &[u8], out: &mut Vec<u8>) {
    for &byte in bytes {
        for shift in (0..8).rev() {
            out.push((byte >> shift) & 1);
        }
    }
}

/// Packs 0/1 bit values back into bytes, MSB first. The bit count must
/// be a multiple of 8; callers check this before unpacking.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let bytes = vec![0x00, 0xFF, 0xA5, 0x3C];
        let mut bits = Vec::new();
        push_bits(&bytes, &mut bits);
        assert_eq!(bits.len(), 32);
        assert_eq!(pack_bits(&bits), bytes);
    }

    #[test]
    fn test_msb_first_order() {
        let mut bits = Vec::new();
        push_bits(&[0b1000_0001], &mut bits);
        assert_eq!(bits, vec![1, 0, 0, 0, 0, 0, 0, 1]);
    }
}
