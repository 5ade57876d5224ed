//! Emoji substitution codec.
//!
//! Maps each lowercased character through a fixed 1:1 table (letters plus
//! a handful of punctuation symbols). Unmapped characters pass through
//! unchanged, so the output is always the same length in symbols as the
//! input. The simplest member of the codec family, but it exercises the
//! full encode/decode contract.

use std::collections::HashMap;
use std::time::Instant;

use crate::artifact::{Artifact, DecodeResult, EncodeResult, QualityMetrics};
use crate::error::{CodecError, Result};

/// Upper bound on input length, in characters. Bounds the cost of a
/// single call; there is no format-imposed capacity.
pub const MAX_INPUT_CHARS: usize = 10_000;

/// Fixed substitution table. Every target is a single Unicode scalar so
/// the inverse lookup can walk `char`s instead of byte offsets.
const TABLE: [(char, char); 30] = [
    ('a', '🍎'),
    ('b', '🍌'),
    ('c', '🐱'),
    ('d', '🐶'),
    ('e', '🐘'),
    ('f', '🐸'),
    ('g', '🍇'),
    ('h', '🏠'),
    ('i', '🍦'),
    ('j', '🎷'),
    ('k', '🔑'),
    ('l', '🦁'),
    ('m', '🌙'),
    ('n', '🥜'),
    ('o', '🐙'),
    ('p', '🥞'),
    ('q', '👑'),
    ('r', '🌈'),
    ('s', '⭐'),
    ('t', '🌴'),
    ('u', '🌂'),
    ('v', '🎻'),
    ('w', '🌊'),
    ('x', '❌'),
    ('y', '💛'),
    ('z', '⚡'),
    ('!', '❗'),
    ('?', '❓'),
    ('.', '🔵'),
    (',', '🔶'),
];

/// Emoji substitution codec.
#[derive(Debug, Clone, Default)]
pub struct EmojiCodec;

impl EmojiCodec {
    /// Creates a new codec.
    pub fn new() -> Self {
        Self
    }

    fn forward(ch: char) -> Option<char> {
        TABLE.iter().find(|(from, _)| *from == ch).map(|(_, to)| *to)
    }

    fn inverse(ch: char) -> Option<char> {
        TABLE.iter().find(|(_, to)| *to == ch).map(|(from, _)| *from)
    }

    /// Encodes text by substituting each lowercased character.
    pub fn encode(&self, text: &str) -> Result<EncodeResult> {
        if text.is_empty() {
            return Err(CodecError::InvalidInput("text is empty".to_string()));
        }
        let char_count = text.chars().count();
        if char_count > MAX_INPUT_CHARS {
            return Err(CodecError::CapacityExceeded {
                requested: char_count,
                maximum: MAX_INPUT_CHARS,
            });
        }

        let start = Instant::now();
        let mut mapped = 0usize;
        let mut out = String::with_capacity(text.len() * 4);
        for ch in text.chars() {
            let lower = ch.to_ascii_lowercase();
            match Self::forward(lower) {
                Some(glyph) => {
                    mapped += 1;
                    out.push(glyph);
                }
                None => out.push(lower),
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("mapped".to_string(), mapped.to_string());
        metadata.insert("total".to_string(), char_count.to_string());

        Ok(EncodeResult {
            artifact: Artifact::Text(out),
            description: format!("Emoji substitution of {char_count} characters"),
            duration: start.elapsed(),
            quality: Some(QualityMetrics {
                expected_fidelity: 1.0,
                capacity_bytes: MAX_INPUT_CHARS,
                robustness: 1.0,
            }),
            metadata,
        })
    }

    /// Decodes substituted text via the inverse lookup, per symbol.
    ///
    /// Confidence is the fraction of symbols that were actual table
    /// targets; pass-through characters count against it.
    pub fn decode(&self, text: &str) -> Result<DecodeResult> {
        if text.is_empty() {
            return Err(CodecError::InvalidInput("text is empty".to_string()));
        }

        let start = Instant::now();
        let mut mapped = 0usize;
        let mut total = 0usize;
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            total += 1;
            match Self::inverse(ch) {
                Some(original) => {
                    mapped += 1;
                    out.push(original);
                }
                None => out.push(ch),
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("mapped".to_string(), mapped.to_string());
        metadata.insert("total".to_string(), total.to_string());

        Ok(DecodeResult {
            text: out,
            duration: start.elapsed(),
            confidence: mapped as f64 / total as f64,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_injective() {
        let mut targets: Vec<char> = TABLE.iter().map(|(_, to)| *to).collect();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), TABLE.len());
    }

    #[test]
    fn test_roundtrip_hello() {
        let codec = EmojiCodec::new();
        let encoded = codec.encode("hello").unwrap();
        let Artifact::Text(glyphs) = &encoded.artifact else {
            panic!("expected text artifact");
        };
        assert_ne!(glyphs, "hello");

        let decoded = codec.decode(glyphs).unwrap();
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.confidence, 1.0);
    }

    #[test]
    fn test_uppercase_is_lowercased() {
        let codec = EmojiCodec::new();
        let encoded = codec.encode("HeLLo").unwrap();
        let Artifact::Text(glyphs) = &encoded.artifact else {
            panic!("expected text artifact");
        };
        let decoded = codec.decode(glyphs).unwrap();
        assert_eq!(decoded.text, "hello");
    }

    #[test]
    fn test_unmapped_passes_through() {
        let codec = EmojiCodec::new();
        let encoded = codec.encode("a1b").unwrap();
        let Artifact::Text(glyphs) = &encoded.artifact else {
            panic!("expected text artifact");
        };
        assert!(glyphs.contains('1'));

        let decoded = codec.decode(glyphs).unwrap();
        assert_eq!(decoded.text, "a1b");
        // One of three symbols is not a table target.
        assert!(decoded.confidence < 1.0);
        assert!((decoded.confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_rejected() {
        let codec = EmojiCodec::new();
        assert!(matches!(
            codec.encode(""),
            Err(CodecError::InvalidInput(_))
        ));
        assert!(matches!(
            codec.decode(""),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_over_ceiling_rejected() {
        let codec = EmojiCodec::new();
        let long = "a".repeat(MAX_INPUT_CHARS + 1);
        match codec.encode(&long) {
            Err(CodecError::CapacityExceeded { requested, maximum }) => {
                assert_eq!(requested, MAX_INPUT_CHARS + 1);
                assert_eq!(maximum, MAX_INPUT_CHARS);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }
}
