//! Tile-parallel pixel kernel dispatch.
//!
//! Embedding work is an independent, order-insensitive per-pixel
//! transform, so the pixel buffer is partitioned into fixed-size tiles
//! (one 16x16 tile's worth of pixels, linearised row-major) and one
//! logical worker runs per tile. A worker only touches its own slice.
//! With `parallel = false` the same kernel runs on a single lane,
//! producing identical output.

use rayon::prelude::*;

/// Pixels per tile (one 16x16 tile's worth).
pub const TILE_PIXELS: usize = 256;

/// Number of parallel execution lanes available to pixel kernels.
pub fn lanes() -> usize {
    rayon::current_num_threads()
}

/// Runs `op` over the buffer one tile at a time. `channels` is the
/// number of interleaved bytes per pixel; each tile slice holds
/// `TILE_PIXELS * channels` bytes (the final tile may be shorter).
///
/// `op` receives the tile index and the tile's mutable slice, and must
/// not assume any ordering between tiles.
pub fn for_each_tile<F>(buf: &mut [u8], channels: usize, parallel: bool, op: F)
where
    F: Fn(usize, &mut [u8]) + Send + Sync,
{
    let tile_bytes = TILE_PIXELS * channels;
    if parallel {
        buf.par_chunks_mut(tile_bytes)
            .enumerate()
            .for_each(|(idx, tile)| op(idx, tile));
    } else {
        for (idx, tile) in buf.chunks_mut(tile_bytes).enumerate() {
            op(idx, tile);
        }
    }
}

/// Runs `op` over bands of `rows_per_band` image rows. Used by the
/// block-domain method, where one band holds a full row of 8x8 blocks.
/// Trailing rows that do not fill a band are left untouched.
pub fn for_each_band<F>(
    buf: &mut [u8],
    row_bytes: usize,
    rows_per_band: usize,
    parallel: bool,
    op: F,
) where
    F: Fn(usize, &mut [u8]) + Send + Sync,
{
    let band_bytes = row_bytes * rows_per_band;
    let full_bands = buf.len() / band_bytes;
    let bounded = &mut buf[..full_bands * band_bytes];
    if parallel {
        bounded
            .par_chunks_mut(band_bytes)
            .enumerate()
            .for_each(|(idx, band)| op(idx, band));
    } else {
        for (idx, band) in bounded.chunks_mut(band_bytes).enumerate() {
            op(idx, band);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_and_sequential_agree() {
        let mut a: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let mut b = a.clone();

        let op = |idx: usize, tile: &mut [u8]| {
            for (i, v) in tile.iter_mut().enumerate() {
                *v = v.wrapping_add(((idx * TILE_PIXELS + i) % 7) as u8);
            }
        };
        for_each_tile(&mut a, 1, true, op);
        for_each_tile(&mut b, 1, false, op);
        assert_eq!(a, b);
    }

    #[test]
    fn test_band_partition_skips_partial_band() {
        // 10 rows of 4 bytes, bands of 8 rows: only the first band runs.
        let mut buf = vec![0u8; 40];
        for_each_band(&mut buf, 4, 8, false, |_, band| {
            for v in band.iter_mut() {
                *v = 1;
            }
        });
        assert!(buf[..32].iter().all(|&v| v == 1));
        assert!(buf[32..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_lanes_nonzero() {
        assert!(lanes() > 0);
    }
}
