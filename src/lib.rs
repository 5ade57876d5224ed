//! # Anymorph - Encode anything as anything
//!
//! Anymorph is a multi-modal encoding engine that converts plaintext into
//! one of several alternate physical representations and reverses each
//! transform on demand:
//! - **Emoji**: 1:1 character-to-glyph substitution
//! - **QR**: a scannable 2-D barcode image with adaptive error correction
//! - **Image stego**: pixel-level embedding in a cover image (bit-plane
//!   or block-domain method, with a PSNR quality gate)
//! - **Audio chirp**: frequency-shift-keyed audio with a sync preamble
//!   and repetition forward error correction
//!
//! ## Overview
//!
//! Callers hand a `{mode, text}` job and an [`EncodingOptions`] value to
//! the [`Coordinator`], which dispatches to the right codec on a bounded
//! background executor and returns an [`EncodeResult`] or a typed
//! [`CodecError`]. Decode is symmetric: an [`Artifact`] plus the mode it
//! was encoded under. The image and audio codecs borrow scratch buffers
//! from a shared [`ResourcePool`], which also classifies memory pressure
//! and drives adaptive batch sizing.
//!
//! ## Example Usage
//!
//! ```rust
//! use anymorph::{Coordinator, EncodeJob, EncodingOptions, Mode, ResourcePool};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let coordinator = Coordinator::new(ResourcePool::new());
//!
//! let encoded = coordinator
//!     .encode(EncodeJob::new(Mode::Emoji, "hello"), EncodingOptions::default())
//!     .await
//!     .unwrap();
//!
//! let decoded = coordinator
//!     .decode(encoded.artifact, Mode::Emoji, EncodingOptions::default())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(decoded.text, "hello");
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`artifact`]: shared artifact/result model and options
//! - [`emoji`], [`qr`], [`stego`], [`audio`]: the four codecs
//! - [`coordinator`]: dispatch, bounded concurrency, batch fan-out
//! - [`pool`]: bounded buffer pool and memory-pressure classification

pub mod artifact;
pub mod audio;
mod bits;
pub mod coordinator;
pub mod emoji;
pub mod error;
pub mod pool;
pub mod qr;
pub mod stego;

// Re-export commonly used types at the crate root
pub use artifact::{
    Artifact, DecodeResult, EncodeJob, EncodeResult, EncodingOptions, Mode, QualityMetrics,
};
pub use audio::AudioChirpCodec;
pub use coordinator::Coordinator;
pub use emoji::EmojiCodec;
pub use error::{CodecError, Result};
pub use pool::{PressureLevel, ResourcePool};
pub use qr::QrCodec;
pub use stego::StegoCodec;
