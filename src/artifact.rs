//! Shared artifact and result model.
//!
//! Every encode produces an [`Artifact`] in one of four physical
//! representations. The tag determines which codec may consume it on
//! decode; cross-tag decode attempts fail before any codec work runs.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// An encoded payload in one of several physical representations.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// Plain text (emoji substitution output).
    Text(String),
    /// Pixel buffer (QR symbols, steganographic covers).
    Image(DynamicImage),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// 16-bit PCM samples.
    Audio {
        /// Signed 16-bit mono samples.
        samples: Vec<i16>,
        /// Samples per second.
        sample_rate: u32,
    },
}

impl Artifact {
    /// Size in bytes, computable without decoding.
    pub fn byte_size(&self) -> usize {
        match self {
            Artifact::Text(s) => s.len(),
            Artifact::Image(img) => img.as_bytes().len(),
            Artifact::Bytes(b) => b.len(),
            Artifact::Audio { samples, .. } => samples.len() * 2,
        }
    }

    /// Static tag name, used in wrong-artifact-type errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Artifact::Text(_) => "text",
            Artifact::Image(_) => "image",
            Artifact::Bytes(_) => "bytes",
            Artifact::Audio { .. } => "audio",
        }
    }

    /// Byte-serializable view of the artifact, for callers that wrap the
    /// result in an outer envelope: UTF-8 for text, a PNG dump for images,
    /// raw bytes as-is, little-endian PCM for audio.
    pub fn serialize_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Artifact::Text(s) => Ok(s.as_bytes().to_vec()),
            Artifact::Image(img) => {
                let mut bytes = Vec::new();
                img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                    .map_err(|e| CodecError::Internal(format!("PNG encode failed: {e}")))?;
                Ok(bytes)
            }
            Artifact::Bytes(b) => Ok(b.clone()),
            Artifact::Audio { samples, .. } => {
                let mut bytes = Vec::with_capacity(samples.len() * 2);
                for s in samples {
                    bytes.extend_from_slice(&s.to_le_bytes());
                }
                Ok(bytes)
            }
        }
    }
}

/// Encoding mode, one per codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// 1:1 character-to-glyph substitution.
    Emoji,
    /// 2-D barcode symbol.
    Qr,
    /// Pixel-level embedding in a cover image.
    ImageStego,
    /// Frequency-shift-keyed audio signal.
    AudioChirp,
}

impl Mode {
    /// All modes, in dispatch order.
    pub const ALL: [Mode; 4] = [Mode::Emoji, Mode::Qr, Mode::ImageStego, Mode::AudioChirp];

    /// Artifact tag this mode produces and consumes.
    pub fn artifact_kind(&self) -> &'static str {
        match self {
            Mode::Emoji => "text",
            Mode::Qr | Mode::ImageStego => "image",
            Mode::AudioChirp => "audio",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Emoji => "emoji",
            Mode::Qr => "qr",
            Mode::ImageStego => "stego",
            Mode::AudioChirp => "chirp",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Mode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "emoji" => Ok(Mode::Emoji),
            "qr" => Ok(Mode::Qr),
            "stego" | "image-stego" | "image" => Ok(Mode::ImageStego),
            "chirp" | "audio-chirp" | "audio" => Ok(Mode::AudioChirp),
            other => Err(CodecError::InvalidInput(format!("unknown mode: {other}"))),
        }
    }
}

/// A unit of encode work: the draft-like value handed in by callers.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Codec to dispatch to.
    pub mode: Mode,
    /// Plaintext payload.
    pub text: String,
}

impl EncodeJob {
    /// Creates a new job.
    pub fn new(mode: Mode, text: impl Into<String>) -> Self {
        Self {
            mode,
            text: text.into(),
        }
    }
}

/// Per-request configuration. Pure data, no hidden global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Run pixel/symbol kernels across available parallel execution units.
    pub use_parallel: bool,
    /// Desired output fidelity, 0.0..=1.0.
    pub quality_target: f64,
    /// Desired processing speed, 0.0..=1.0. Trades against quality.
    pub speed_target: f64,
    /// Soft memory ceiling for a single operation, in MB.
    pub memory_ceiling_mb: usize,
    /// Maximum wall-clock time for a single operation.
    pub timeout: Duration,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            use_parallel: true,
            quality_target: 0.8,
            speed_target: 0.5,
            memory_ceiling_mb: 256,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Quality metadata attached to an encode result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Expected fidelity score (codec-specific scale, e.g. PSNR dB).
    pub expected_fidelity: f64,
    /// Payload capacity of the produced artifact, in bytes.
    pub capacity_bytes: usize,
    /// Robustness against corruption, 0.0..=1.0.
    pub robustness: f64,
}

/// The outcome of one encode call. Immutable once produced.
#[derive(Debug, Clone)]
pub struct EncodeResult {
    /// The encoded artifact.
    pub artifact: Artifact,
    /// Human-readable description of what was produced.
    pub description: String,
    /// Wall-clock processing time.
    pub duration: Duration,
    /// Optional quality metrics.
    pub quality: Option<QualityMetrics>,
    /// Codec-specific key/value metadata.
    pub metadata: HashMap<String, String>,
}

/// The outcome of one decode call.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    /// Recovered plaintext.
    pub text: String,
    /// Wall-clock processing time.
    pub duration: Duration,
    /// How confident the codec is in the recovery, 0.0..=1.0.
    /// Codec-specific and reflects actual recoverability.
    pub confidence: f64,
    /// Codec-specific key/value metadata.
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_byte_size_without_decode() {
        let text = Artifact::Text("hello".to_string());
        assert_eq!(text.byte_size(), 5);

        let bytes = Artifact::Bytes(vec![1, 2, 3]);
        assert_eq!(bytes.byte_size(), 3);

        let audio = Artifact::Audio {
            samples: vec![0i16; 100],
            sample_rate: 44_100,
        };
        assert_eq!(audio.byte_size(), 200);
    }

    #[test]
    fn test_artifact_serialize_text_is_utf8() {
        let a = Artifact::Text("héllo".to_string());
        assert_eq!(a.serialize_bytes().unwrap(), "héllo".as_bytes());
    }

    #[test]
    fn test_artifact_serialize_audio_is_le_pcm() {
        let a = Artifact::Audio {
            samples: vec![1, -2],
            sample_rate: 8_000,
        };
        assert_eq!(a.serialize_bytes().unwrap(), vec![1, 0, 0xFE, 0xFF]);
    }

    #[test]
    fn test_artifact_serialize_image_is_png() {
        let img = DynamicImage::new_rgb8(4, 4);
        let a = Artifact::Image(img);
        let bytes = a.serialize_bytes().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_mode_parse_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert!("warbled".parse::<Mode>().is_err());
    }

    #[test]
    fn test_default_options_sane() {
        let opts = EncodingOptions::default();
        assert!(opts.use_parallel);
        assert!(opts.quality_target > 0.0 && opts.quality_target <= 1.0);
        assert!(opts.timeout > Duration::ZERO);
    }
}
