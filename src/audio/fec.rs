//! Repetition forward-error-correction.
//!
//! Each payload bit is transmitted three times; the decoder outputs the
//! majority value of every 3-bit group. A single flipped copy per group
//! is corrected; two flips win the vote, by design of majority decoding.

use crate::error::{CodecError, Result};

/// Copies per payload bit.
pub const REPEAT: usize = 3;

/// Triples every bit.
pub fn encode(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() * REPEAT);
    for &bit in bits {
        out.extend_from_slice(&[bit; REPEAT]);
    }
    out
}

/// Majority-votes each group of three received bits.
///
/// Fails if the bit count is not a multiple of the repetition factor;
/// that means the receiver lost symbol alignment.
pub fn decode(bits: &[u8]) -> Result<Vec<u8>> {
    if bits.len() % REPEAT != 0 {
        return Err(CodecError::InvalidInput(format!(
            "bit count {} is not a multiple of {REPEAT}",
            bits.len()
        )));
    }
    Ok(bits
        .chunks_exact(REPEAT)
        .map(|group| {
            let ones: usize = group.iter().map(|&b| b as usize).sum();
            (ones >= 2) as u8
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_triples() {
        assert_eq!(encode(&[1, 0]), vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_clean_roundtrip() {
        let bits = vec![1, 0, 1, 1, 0, 0, 1, 0];
        assert_eq!(decode(&encode(&bits)).unwrap(), bits);
    }

    #[test]
    fn test_single_flip_in_any_position_corrected() {
        let bits = vec![1, 0, 1, 1];
        let clean = encode(&bits);
        for i in 0..clean.len() {
            let mut corrupted = clean.clone();
            corrupted[i] ^= 1;
            assert_eq!(decode(&corrupted).unwrap(), bits, "flip at {i}");
        }
    }

    #[test]
    fn test_two_flips_follow_the_majority() {
        // Adversarially flip 2 of 3 copies: the vote must output the
        // majority value, which is no longer the original bit.
        let mut group = encode(&[0]);
        group[0] ^= 1;
        group[2] ^= 1;
        assert_eq!(decode(&group).unwrap(), vec![1]);
    }

    #[test]
    fn test_misaligned_length_rejected() {
        assert!(matches!(
            decode(&[1, 0]),
            Err(CodecError::InvalidInput(_))
        ));
    }
}
