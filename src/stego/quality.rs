//! Perceptual quality measurement.
//!
//! PSNR between the cover and the stego image over all RGB channel
//! differences. The squared-error sum is an associative reduction, so
//! the parallel and sequential paths produce the same value.

use rayon::prelude::*;

const REDUCE_CHUNK: usize = 4096;

fn chunk_sq_err(a: &[u8], b: &[u8]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// Peak signal-to-noise ratio in dB: `20 * log10(255 / sqrt(MSE))`.
///
/// Identical buffers yield `f64::INFINITY`. Panics only if the buffers
/// differ in length, which would be a caller bug.
pub fn psnr(original: &[u8], modified: &[u8], parallel: bool) -> f64 {
    assert_eq!(original.len(), modified.len());
    if original.is_empty() {
        return f64::INFINITY;
    }

    let sq_err: f64 = if parallel {
        original
            .par_chunks(REDUCE_CHUNK)
            .zip(modified.par_chunks(REDUCE_CHUNK))
            .map(|(a, b)| chunk_sq_err(a, b))
            .sum()
    } else {
        chunk_sq_err(original, modified)
    };

    let mse = sq_err / original.len() as f64;
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * (255.0 / mse.sqrt()).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_infinite() {
        let buf = vec![100u8; 1000];
        assert_eq!(psnr(&buf, &buf, false), f64::INFINITY);
    }

    #[test]
    fn test_known_value() {
        // Every byte off by one: MSE = 1, PSNR = 20*log10(255) ~ 48.13 dB.
        let a = vec![100u8; 10_000];
        let b = vec![101u8; 10_000];
        let value = psnr(&a, &b, false);
        assert!((value - 48.13).abs() < 0.01);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a: Vec<u8> = (0..100_000).map(|i| (i % 256) as u8).collect();
        let b: Vec<u8> = (0..100_000).map(|i| ((i + i % 3) % 256) as u8).collect();
        let seq = psnr(&a, &b, false);
        let par = psnr(&a, &b, true);
        assert!((seq - par).abs() < 1e-9);
    }

    #[test]
    fn test_heavier_distortion_scores_lower() {
        let a = vec![100u8; 10_000];
        let slight = vec![101u8; 10_000];
        let heavy = vec![120u8; 10_000];
        assert!(psnr(&a, &slight, false) > psnr(&a, &heavy, false));
    }
}
