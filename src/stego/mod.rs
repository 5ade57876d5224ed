//! Steganographic image codec.
//!
//! Embeds a length-prefixed payload into the pixels of a cover image
//! using one of two interchangeable methods:
//! - bit-plane: LSB of every RGB channel, 3 bits/pixel (fast, high capacity)
//! - block-domain: one bit per 8x8 block in mid-band cells (robust)
//!
//! Frame format: [4 bytes big-endian length] + [payload bytes]. The
//! length must pass a sanity ceiling before a decode attempt allocates
//! anything.
//!
//! After embedding, a PSNR quality gate rejects results that fall below
//! the target-derived floor. This is a hard failure, not a warning.

mod bitplane;
mod kernel;
mod quality;
mod transform;

pub use kernel::{lanes, TILE_PIXELS};
pub use quality::psnr;

use std::collections::HashMap;
use std::time::Instant;

use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

use crate::artifact::{Artifact, DecodeResult, EncodeResult, EncodingOptions, QualityMetrics};
use crate::bits::{pack_bits, push_bits};
use crate::error::{CodecError, Result};
use crate::pool::ResourcePool;

/// Length-prefix header size in bytes.
pub const HEADER_LEN: usize = 4;

/// Sanity ceiling on the decoded length prefix. Anything above this is
/// treated as garbage before any buffer is allocated.
pub const MAX_PAYLOAD_BYTES: usize = 1_000_000;

/// PSNR floor at quality target 1.0; the gate scales it by the target.
const BASE_PSNR_DB: f64 = 40.0;

/// Quality target above which the block-domain method is selected.
const TRANSFORM_QUALITY_CUTOFF: f64 = 0.8;

/// Smallest generated cover edge, in pixels.
const MIN_COVER_SIDE: u32 = 256;

/// Embedding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMethod {
    /// LSB of each RGB channel, 3 bits per pixel.
    BitPlane,
    /// One bit per 8x8 block, redundant mid-band cells.
    Transform,
}

impl EmbedMethod {
    fn name(&self) -> &'static str {
        match self {
            EmbedMethod::BitPlane => "bit-plane",
            EmbedMethod::Transform => "transform",
        }
    }

    fn robustness(&self) -> f64 {
        match self {
            EmbedMethod::BitPlane => 0.3,
            EmbedMethod::Transform => 0.7,
        }
    }

    fn capacity_bytes(&self, width: u32, height: u32) -> usize {
        match self {
            EmbedMethod::BitPlane => bitplane::capacity_bytes(width, height),
            EmbedMethod::Transform => transform::capacity_bytes(width, height),
        }
    }
}

/// Steganographic image codec.
#[derive(Debug, Clone)]
pub struct StegoCodec {
    pool: ResourcePool,
    cover: Option<DynamicImage>,
}

impl StegoCodec {
    /// Creates a codec that generates its own cover images.
    pub fn new(pool: ResourcePool) -> Self {
        Self { pool, cover: None }
    }

    /// Creates a codec that embeds into the supplied cover image.
    pub fn with_cover(pool: ResourcePool, cover: DynamicImage) -> Self {
        Self {
            pool,
            cover: Some(cover),
        }
    }

    /// True when pixel kernels have at least one execution lane. The
    /// sequential path always exists, so this only reports false if the
    /// thread pool failed to initialize entirely.
    pub fn is_available(&self) -> bool {
        lanes() > 0
    }

    /// Method selection policy: robustness over capacity once the
    /// quality target crosses the cutoff.
    pub fn method_for(quality_target: f64) -> EmbedMethod {
        if quality_target > TRANSFORM_QUALITY_CUTOFF {
            EmbedMethod::Transform
        } else {
            EmbedMethod::BitPlane
        }
    }

    /// Embeds text into a cover image.
    pub fn encode(&self, text: &str, options: &EncodingOptions) -> Result<EncodeResult> {
        if text.is_empty() {
            return Err(CodecError::InvalidInput("text is empty".to_string()));
        }
        let payload = text.as_bytes();
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(CodecError::CapacityExceeded {
                requested: payload.len(),
                maximum: MAX_PAYLOAD_BYTES,
            });
        }

        let start = Instant::now();
        let method = Self::method_for(options.quality_target);

        let cover: RgbImage = match &self.cover {
            Some(img) => img.to_rgb8(),
            None => generate_cover(payload.len(), method),
        };
        let (width, height) = cover.dimensions();

        // Two pixel buffers resident at once.
        let needed_mb = (width as usize * height as usize * 3 * 2) / (1024 * 1024);
        if needed_mb > options.memory_ceiling_mb {
            return Err(CodecError::InsufficientMemory {
                needed_mb,
                ceiling_mb: options.memory_ceiling_mb,
            });
        }

        let capacity = method.capacity_bytes(width, height);
        if payload.len() > capacity {
            return Err(CodecError::CapacityExceeded {
                requested: payload.len(),
                maximum: capacity,
            });
        }

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);

        let mut bits = self.pool.borrow_bytes(frame.len() * 8);
        push_bits(&frame, &mut bits);

        let mut stego = cover.clone();
        match method {
            EmbedMethod::BitPlane => {
                bitplane::embed(&mut stego, &bits, options.use_parallel);
            }
            EmbedMethod::Transform => {
                transform::embed(&mut stego, width as usize, &bits, options.use_parallel);
            }
        }

        let score = quality::psnr(cover.as_raw(), stego.as_raw(), options.use_parallel);
        let threshold = BASE_PSNR_DB * options.quality_target;
        enforce_gate(score, threshold)?;
        debug!(method = method.name(), psnr_db = score, "embedding complete");

        let mut metadata = HashMap::new();
        metadata.insert("method".to_string(), method.name().to_string());
        metadata.insert("psnr_db".to_string(), format!("{score:.1}"));
        metadata.insert(
            "cover".to_string(),
            if self.cover.is_some() {
                format!("supplied {width}x{height}")
            } else {
                format!("generated {width}x{height}")
            },
        );

        Ok(EncodeResult {
            artifact: Artifact::Image(DynamicImage::ImageRgb8(stego)),
            description: format!(
                "Steganographic image, {} method, {width}x{height} cover",
                method.name()
            ),
            duration: start.elapsed(),
            quality: Some(QualityMetrics {
                expected_fidelity: score,
                capacity_bytes: capacity,
                robustness: method.robustness(),
            }),
            metadata,
        })
    }

    /// Extracts text from a stego image.
    ///
    /// Tries bit-plane extraction first; if the header fails its sanity
    /// check or the payload is not UTF-8, falls back to block-domain
    /// extraction with identical framing and a lower confidence.
    pub fn decode(&self, image: &DynamicImage, _options: &EncodingOptions) -> Result<DecodeResult> {
        let start = Instant::now();
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let raw = rgb.as_raw();

        if let Some(text) = self.try_bitplane(raw, width, height) {
            return Ok(self.decode_result(text, EmbedMethod::BitPlane, 0.9, start));
        }
        if let Some(text) = self.try_transform(raw, width, height) {
            return Ok(self.decode_result(text, EmbedMethod::Transform, 0.7, start));
        }

        Err(CodecError::InvalidInput(
            "no recoverable payload in image".to_string(),
        ))
    }

    fn decode_result(
        &self,
        text: String,
        method: EmbedMethod,
        confidence: f64,
        start: Instant,
    ) -> DecodeResult {
        let mut metadata = HashMap::new();
        metadata.insert("method".to_string(), method.name().to_string());
        DecodeResult {
            text,
            duration: start.elapsed(),
            confidence,
            metadata,
        }
    }

    fn try_bitplane(&self, raw: &[u8], width: u32, height: u32) -> Option<String> {
        if raw.len() < HEADER_LEN * 8 {
            return None;
        }
        let mut header_bits = Vec::with_capacity(HEADER_LEN * 8);
        bitplane::extract(raw, 0, HEADER_LEN * 8, &mut header_bits);
        let len = header_from_bits(&header_bits)?;
        if len > MAX_PAYLOAD_BYTES || len > bitplane::capacity_bytes(width, height) {
            return None;
        }

        let mut bits = self.pool.borrow_bytes(len * 8);
        if !bitplane::extract(raw, HEADER_LEN * 8, len * 8, &mut bits) {
            return None;
        }
        String::from_utf8(pack_bits(&bits)).ok()
    }

    fn try_transform(&self, raw: &[u8], width: u32, height: u32) -> Option<String> {
        let mut header_bits = Vec::with_capacity(HEADER_LEN * 8);
        if !transform::extract(
            raw,
            width as usize,
            height as usize,
            0,
            HEADER_LEN * 8,
            &mut header_bits,
        ) {
            return None;
        }
        let len = header_from_bits(&header_bits)?;
        if len > MAX_PAYLOAD_BYTES || len > transform::capacity_bytes(width, height) {
            return None;
        }

        let mut bits = self.pool.borrow_bytes(len * 8);
        if !transform::extract(
            raw,
            width as usize,
            height as usize,
            HEADER_LEN * 8,
            len * 8,
            &mut bits,
        ) {
            return None;
        }
        String::from_utf8(pack_bits(&bits)).ok()
    }
}

/// Fails the encode when the measured score is below the target-derived
/// floor, carrying both values for the caller's error message.
fn enforce_gate(actual: f64, expected: f64) -> Result<()> {
    if actual < expected {
        return Err(CodecError::QualityThresholdNotMet { expected, actual });
    }
    Ok(())
}

/// Parses the 4-byte big-endian length header from its bit expansion.
/// Zero lengths are treated as no-payload (the encoder never emits them).
fn header_from_bits(bits: &[u8]) -> Option<usize> {
    if bits.len() != HEADER_LEN * 8 {
        return None;
    }
    let bytes = pack_bits(bits);
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len == 0 {
        return None;
    }
    Some(len)
}

/// Deterministic gradient cover sized so the payload fits with the given
/// method. Never smaller than the minimum side, rounded up to 16 pixels.
fn generate_cover(payload_len: usize, method: EmbedMethod) -> RgbImage {
    let needed_bits = (payload_len + HEADER_LEN) * 8;
    let side = match method {
        EmbedMethod::BitPlane => {
            let pixels = needed_bits.div_ceil(3);
            (pixels as f64).sqrt().ceil() as u32
        }
        EmbedMethod::Transform => {
            (needed_bits as f64).sqrt().ceil() as u32 * transform::BLOCK as u32
        }
    };
    let side = side.max(MIN_COVER_SIDE).next_multiple_of(16);
    RgbImage::from_fn(side, side, |x, y| {
        Rgb([
            ((x * 17) % 256) as u8,
            ((y * 23) % 256) as u8,
            (((x + y) * 31) % 256) as u8,
        ])
    })
}
