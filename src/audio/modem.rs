//! BFSK symbol synthesis and demodulation.
//!
//! One bit per symbol: a pure sine at the base frequency carries 0, the
//! shifted frequency carries 1. Symbols are Hann-windowed to suppress
//! spectral leakage at their boundaries. The receiver runs a DFT per
//! symbol window and classifies by the peak-magnitude bin.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{CodecError, Result};
use crate::pool::ResourcePool;

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per symbol (10 ms), giving 100 Hz DFT bin resolution.
pub const SAMPLES_PER_SYMBOL: usize = 441;

/// Carrier for a 0 bit.
pub const BASE_FREQ_HZ: f64 = 1_000.0;

/// Added to the base carrier for a 1 bit.
pub const SHIFT_HZ: f64 = 500.0;

/// Peak amplitude as a fraction of i16 full scale.
const AMPLITUDE: f64 = 0.8;

fn hann(n: usize, len: usize) -> f64 {
    0.5 * (1.0 - (2.0 * PI * n as f64 / (len as f64 - 1.0)).cos())
}

/// Synthesizes one windowed sine symbol per bit into a PCM buffer.
pub fn synthesize(bits: &[u8]) -> Vec<i16> {
    let mut samples = Vec::with_capacity(bits.len() * SAMPLES_PER_SYMBOL);
    for &bit in bits {
        let freq = if bit == 1 {
            BASE_FREQ_HZ + SHIFT_HZ
        } else {
            BASE_FREQ_HZ
        };
        for n in 0..SAMPLES_PER_SYMBOL {
            let t = n as f64 / SAMPLE_RATE as f64;
            let value = AMPLITUDE * hann(n, SAMPLES_PER_SYMBOL) * (2.0 * PI * freq * t).sin();
            samples.push((value * i16::MAX as f64) as i16);
        }
    }
    samples
}

/// Demodulates every whole symbol window into a bit.
///
/// For each window: DFT, locate the peak-magnitude bin below Nyquist
/// (skipping DC), and classify as 1 when the peak frequency is above the
/// midpoint between the two carriers.
pub fn demodulate(samples: &[i16], pool: &ResourcePool) -> Result<Vec<u8>> {
    if samples.len() < SAMPLES_PER_SYMBOL {
        return Err(CodecError::InvalidInput(format!(
            "audio too short: {} samples, need at least {SAMPLES_PER_SYMBOL}",
            samples.len()
        )));
    }

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(SAMPLES_PER_SYMBOL);
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); SAMPLES_PER_SYMBOL];
    let mut window = pool.borrow_compute(SAMPLES_PER_SYMBOL);

    let midpoint = BASE_FREQ_HZ + SHIFT_HZ / 2.0;
    let bin_hz = SAMPLE_RATE as f64 / SAMPLES_PER_SYMBOL as f64;
    let mut bits = Vec::with_capacity(samples.len() / SAMPLES_PER_SYMBOL);

    for chunk in samples.chunks_exact(SAMPLES_PER_SYMBOL) {
        window.clear();
        window.extend(chunk.iter().map(|&s| s as f32 / i16::MAX as f32));
        for (slot, &value) in spectrum.iter_mut().zip(window.iter()) {
            *slot = Complex::new(value, 0.0);
        }
        fft.process(&mut spectrum);

        let half = SAMPLES_PER_SYMBOL / 2;
        let mut peak_bin = 1;
        let mut peak_mag = 0.0f32;
        for (bin, value) in spectrum.iter().enumerate().take(half).skip(1) {
            let mag = value.norm_sqr();
            if mag > peak_mag {
                peak_mag = mag;
                peak_bin = bin;
            }
        }

        let peak_hz = peak_bin as f64 * bin_hz;
        bits.push((peak_hz > midpoint) as u8);
    }

    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_length() {
        let samples = synthesize(&[1, 0, 1]);
        assert_eq!(samples.len(), 3 * SAMPLES_PER_SYMBOL);
    }

    #[test]
    fn test_amplitude_bounded() {
        let samples = synthesize(&[1; 8]);
        let ceiling = (AMPLITUDE * i16::MAX as f64) as i16;
        assert!(samples.iter().all(|&s| s.abs() <= ceiling));
    }

    #[test]
    fn test_window_tapers_symbol_edges() {
        let samples = synthesize(&[1]);
        assert_eq!(samples[0], 0);
        // Mid-symbol energy dominates the edges.
        let mid = samples[SAMPLES_PER_SYMBOL / 2].unsigned_abs() as u32;
        let edge = samples[3].unsigned_abs() as u32;
        assert!(mid > edge * 4);
    }

    #[test]
    fn test_demodulate_roundtrip() {
        let pool = ResourcePool::new();
        let bits = vec![1, 0, 1, 1, 0, 0, 1, 0, 0, 1];
        let samples = synthesize(&bits);
        assert_eq!(demodulate(&samples, &pool).unwrap(), bits);
    }

    #[test]
    fn test_too_short_rejected() {
        let pool = ResourcePool::new();
        assert!(matches!(
            demodulate(&[0i16; 10], &pool),
            Err(CodecError::InvalidInput(_))
        ));
    }
}
