//! Audio chirp codec.
//!
//! Binary frequency-shift keying with a synchronization preamble and a
//! 3x repetition FEC layer. Text bytes become an MSB-first bit stream,
//! every bit is tripled, and a fixed alternating preamble is prepended
//! for receiver alignment. Each bit is one Hann-windowed sine symbol.
//!
//! Everything here runs on the CPU; there is no accelerated path to
//! fall back from, so encode/decode never report an unavailable backend.

mod fec;
mod modem;

pub use fec::REPEAT as FEC_REPEAT;
pub use modem::{BASE_FREQ_HZ, SAMPLES_PER_SYMBOL, SAMPLE_RATE, SHIFT_HZ};

use std::collections::HashMap;
use std::time::Instant;

use crate::artifact::{Artifact, DecodeResult, EncodeResult, EncodingOptions, QualityMetrics};
use crate::bits::{pack_bits, push_bits};
use crate::error::{CodecError, Result};
use crate::pool::ResourcePool;

/// Synchronization preamble length in bits (alternating 1 0 1 0 ...).
/// Discarded on decode.
pub const PREAMBLE_BITS: usize = 16;

/// Payload ceiling in bytes; bounds the output at roughly 24 seconds of
/// signal at the fixed symbol rate.
pub const MAX_TEXT_BYTES: usize = 4_096;

/// Assumed noise floor for the SNR estimate, in dB full scale.
const NOISE_FLOOR_DB: f64 = -60.0;

/// SNR mapped linearly onto confidence over this window, in dB.
const SNR_LOW_DB: f64 = 10.0;
const SNR_HIGH_DB: f64 = 40.0;

/// Audio chirp codec.
#[derive(Debug, Clone)]
pub struct AudioChirpCodec {
    pool: ResourcePool,
}

impl AudioChirpCodec {
    /// Creates a new codec borrowing scratch buffers from the pool.
    pub fn new(pool: ResourcePool) -> Self {
        Self { pool }
    }

    fn preamble() -> Vec<u8> {
        (0..PREAMBLE_BITS).map(|i| (i % 2 == 0) as u8).collect()
    }

    /// Encodes text into a frequency-shift-keyed PCM buffer.
    pub fn encode(&self, text: &str, _options: &EncodingOptions) -> Result<EncodeResult> {
        if text.is_empty() {
            return Err(CodecError::InvalidInput("text is empty".to_string()));
        }
        let payload = text.as_bytes();
        if payload.len() > MAX_TEXT_BYTES {
            return Err(CodecError::CapacityExceeded {
                requested: payload.len(),
                maximum: MAX_TEXT_BYTES,
            });
        }

        let start = Instant::now();
        let mut payload_bits = Vec::with_capacity(payload.len() * 8);
        push_bits(payload, &mut payload_bits);

        let mut bits = Self::preamble();
        bits.extend(fec::encode(&payload_bits));
        let symbol_count = bits.len();

        let samples = modem::synthesize(&bits);

        let mut metadata = HashMap::new();
        metadata.insert("symbols".to_string(), symbol_count.to_string());
        metadata.insert(
            "samples_per_symbol".to_string(),
            SAMPLES_PER_SYMBOL.to_string(),
        );
        metadata.insert("base_hz".to_string(), format!("{BASE_FREQ_HZ:.0}"));
        metadata.insert("shift_hz".to_string(), format!("{SHIFT_HZ:.0}"));

        Ok(EncodeResult {
            artifact: Artifact::Audio {
                samples,
                sample_rate: SAMPLE_RATE,
            },
            description: format!(
                "BFSK audio, {symbol_count} symbols at {SAMPLE_RATE} Hz ({:.2} s)",
                symbol_count as f64 * SAMPLES_PER_SYMBOL as f64 / SAMPLE_RATE as f64
            ),
            duration: start.elapsed(),
            quality: Some(QualityMetrics {
                expected_fidelity: 1.0,
                capacity_bytes: MAX_TEXT_BYTES,
                robustness: 0.6,
            }),
            metadata,
        })
    }

    /// Decodes a PCM buffer back to text.
    pub fn decode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        _options: &EncodingOptions,
    ) -> Result<DecodeResult> {
        if sample_rate != SAMPLE_RATE {
            return Err(CodecError::InvalidInput(format!(
                "unsupported sample rate {sample_rate}, expected {SAMPLE_RATE}"
            )));
        }

        let start = Instant::now();
        let raw_bits = modem::demodulate(samples, &self.pool)?;
        if raw_bits.len() <= PREAMBLE_BITS {
            return Err(CodecError::InvalidInput(format!(
                "audio carries {} symbols, preamble alone needs {PREAMBLE_BITS}",
                raw_bits.len()
            )));
        }

        let payload_bits = fec::decode(&raw_bits[PREAMBLE_BITS..])?;
        if payload_bits.len() % 8 != 0 {
            return Err(CodecError::InvalidInput(format!(
                "decoded bit count {} is not a multiple of 8",
                payload_bits.len()
            )));
        }

        let bytes = pack_bits(&payload_bits);
        let text = String::from_utf8(bytes)
            .map_err(|e| CodecError::InvalidInput(format!("payload is not UTF-8: {e}")))?;

        let confidence = estimate_confidence(samples);
        let mut metadata = HashMap::new();
        metadata.insert(
            "payload_symbols".to_string(),
            (raw_bits.len() - PREAMBLE_BITS).to_string(),
        );

        Ok(DecodeResult {
            text,
            duration: start.elapsed(),
            confidence,
            metadata,
        })
    }
}

/// Maps the signal's RMS level against an assumed noise floor onto a
/// confidence in [0, 1]. A heuristic, not a calibrated measurement.
fn estimate_confidence(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();
    if rms <= 0.0 {
        return 0.0;
    }

    let level_db = 20.0 * rms.log10();
    let snr_db = level_db - NOISE_FLOOR_DB;
    ((snr_db - SNR_LOW_DB) / (SNR_HIGH_DB - SNR_LOW_DB)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> EncodingOptions {
        EncodingOptions::default()
    }

    #[test]
    fn test_pcm_length_formula() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        let encoded = codec.encode("hi", &options()).unwrap();
        let Artifact::Audio { samples, .. } = &encoded.artifact else {
            panic!("expected audio artifact");
        };
        // 2 bytes -> 16 bits -> 48 after FEC, plus the preamble.
        assert_eq!(
            samples.len(),
            (PREAMBLE_BITS + 3 * 16) * SAMPLES_PER_SYMBOL
        );
    }

    #[test]
    fn test_roundtrip_hi() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        let encoded = codec.encode("hi", &options()).unwrap();
        let Artifact::Audio {
            samples,
            sample_rate,
        } = &encoded.artifact
        else {
            panic!("expected audio artifact");
        };

        let decoded = codec.decode(samples, *sample_rate, &options()).unwrap();
        assert_eq!(decoded.text, "hi");
        assert!(decoded.confidence > 0.8);
    }

    #[test]
    fn test_roundtrip_longer_text() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        let text = "The quick brown fox jumps over 13 lazy dogs.";
        let encoded = codec.encode(text, &options()).unwrap();
        let Artifact::Audio {
            samples,
            sample_rate,
        } = &encoded.artifact
        else {
            panic!("expected audio artifact");
        };

        let decoded = codec.decode(samples, *sample_rate, &options()).unwrap();
        assert_eq!(decoded.text, text);
    }

    #[test]
    fn test_single_symbol_corruption_corrected() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        let encoded = codec.encode("a", &options()).unwrap();
        let Artifact::Audio {
            mut samples,
            sample_rate,
        } = encoded.artifact
        else {
            panic!("expected audio artifact");
        };

        // Replace the first payload symbol with the opposite carrier:
        // one corrupted copy per repetition group is voted out.
        let flipped = modem::synthesize(&[1]);
        let offset = PREAMBLE_BITS * SAMPLES_PER_SYMBOL;
        samples[offset..offset + SAMPLES_PER_SYMBOL].copy_from_slice(&flipped);

        let decoded = codec.decode(&samples, sample_rate, &options()).unwrap();
        assert_eq!(decoded.text, "a");
    }

    #[test]
    fn test_misaligned_symbol_count_rejected() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        // 16 preamble symbols plus 25 payload symbols: not a multiple of 3.
        let mut bits = AudioChirpCodec::preamble();
        bits.extend(std::iter::repeat(0u8).take(25));
        let samples = modem::synthesize(&bits);

        assert!(matches!(
            codec.decode(&samples, SAMPLE_RATE, &options()),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        assert!(matches!(
            codec.decode(&[0i16; 44_100], 22_050, &options()),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_and_oversized_input() {
        let codec = AudioChirpCodec::new(ResourcePool::new());
        assert!(matches!(
            codec.encode("", &options()),
            Err(CodecError::InvalidInput(_))
        ));
        let huge = "x".repeat(MAX_TEXT_BYTES + 1);
        match codec.encode(&huge, &options()) {
            Err(CodecError::CapacityExceeded { requested, maximum }) => {
                assert_eq!(requested, MAX_TEXT_BYTES + 1);
                assert_eq!(maximum, MAX_TEXT_BYTES);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_silence_has_zero_confidence() {
        assert_eq!(estimate_confidence(&[0i16; 1000]), 0.0);
    }
}
