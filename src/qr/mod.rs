//! Barcode (QR) codec.
//!
//! Renders the payload into a matrix symbol with an error-correction
//! level derived from the quality target, and recovers text by running a
//! pattern detector against the image.

mod generator;
mod reader;

pub use generator::{module_scale, render, MIN_MODULE_PX};
pub use reader::read_symbol;

use std::collections::HashMap;
use std::time::Instant;

use image::DynamicImage;
use qrcode::{EcLevel, QrCode};

use crate::artifact::{Artifact, DecodeResult, EncodeResult, EncodingOptions, QualityMetrics};
use crate::error::{CodecError, Result};

/// Practical payload ceiling: the byte-mode capacity of the largest
/// standard symbol version at the lowest error-correction level.
pub const QR_MAX_BYTES: usize = 2_953;

/// Barcode codec.
#[derive(Debug, Clone, Default)]
pub struct QrCodec;

impl QrCodec {
    /// Creates a new codec.
    pub fn new() -> Self {
        Self
    }

    /// Error-correction level for a quality target. Monotonic: a higher
    /// target never selects a weaker level.
    pub fn ec_level_for(quality_target: f64) -> EcLevel {
        if quality_target >= 0.9 {
            EcLevel::H
        } else if quality_target >= 0.7 {
            EcLevel::Q
        } else if quality_target >= 0.5 {
            EcLevel::M
        } else {
            EcLevel::L
        }
    }

    /// Rated module-recovery percentage of an error-correction level.
    fn recovery_rate(level: EcLevel) -> f64 {
        match level {
            EcLevel::L => 0.07,
            EcLevel::M => 0.15,
            EcLevel::Q => 0.25,
            EcLevel::H => 0.30,
        }
    }

    fn level_name(level: EcLevel) -> &'static str {
        match level {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        }
    }

    /// Encodes text into a QR symbol image.
    ///
    /// The quality-derived level is an upper bound: large payloads that
    /// only fit at a lower level step down toward L. Only payloads that
    /// do not fit at L at all are a capacity error.
    pub fn encode(&self, text: &str, options: &EncodingOptions) -> Result<EncodeResult> {
        if text.is_empty() {
            return Err(CodecError::InvalidInput("text is empty".to_string()));
        }
        if text.len() > QR_MAX_BYTES {
            return Err(CodecError::CapacityExceeded {
                requested: text.len(),
                maximum: QR_MAX_BYTES,
            });
        }

        let start = Instant::now();
        let preferred = Self::ec_level_for(options.quality_target);
        let candidates: &[EcLevel] = match preferred {
            EcLevel::H => &[EcLevel::H, EcLevel::Q, EcLevel::M, EcLevel::L],
            EcLevel::Q => &[EcLevel::Q, EcLevel::M, EcLevel::L],
            EcLevel::M => &[EcLevel::M, EcLevel::L],
            EcLevel::L => &[EcLevel::L],
        };

        let mut built: Option<(QrCode, EcLevel)> = None;
        for &level in candidates {
            if let Ok(code) = QrCode::with_error_correction_level(text.as_bytes(), level) {
                built = Some((code, level));
                break;
            }
        }
        let Some((code, level)) = built else {
            return Err(CodecError::CapacityExceeded {
                requested: text.len(),
                maximum: QR_MAX_BYTES,
            });
        };

        let module_px = module_scale(options.quality_target, options.speed_target);
        let modules = code.width();
        let image = render(&code, module_px);

        let mut metadata = HashMap::new();
        metadata.insert("ec_level".to_string(), Self::level_name(level).to_string());
        metadata.insert("modules".to_string(), modules.to_string());
        metadata.insert("module_px".to_string(), module_px.to_string());

        Ok(EncodeResult {
            artifact: Artifact::Image(DynamicImage::ImageLuma8(image)),
            description: format!(
                "QR symbol, EC level {}, {modules}x{modules} modules",
                Self::level_name(level)
            ),
            duration: start.elapsed(),
            quality: Some(QualityMetrics {
                expected_fidelity: 1.0,
                capacity_bytes: QR_MAX_BYTES,
                robustness: Self::recovery_rate(level) / 0.30,
            }),
            metadata,
        })
    }

    /// Decodes a QR symbol image back to text.
    pub fn decode(&self, image: &DynamicImage) -> Result<DecodeResult> {
        let start = Instant::now();
        let (text, confidence, grids) = read_symbol(image)?;

        let mut metadata = HashMap::new();
        metadata.insert("grids".to_string(), grids.to_string());

        Ok(DecodeResult {
            text,
            duration: start.elapsed(),
            confidence,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ec_level_mapping_is_monotonic() {
        assert_eq!(QrCodec::ec_level_for(0.95), EcLevel::H);
        assert_eq!(QrCodec::ec_level_for(0.9), EcLevel::H);
        assert_eq!(QrCodec::ec_level_for(0.7), EcLevel::Q);
        assert_eq!(QrCodec::ec_level_for(0.5), EcLevel::M);
        assert_eq!(QrCodec::ec_level_for(0.2), EcLevel::L);
        assert_eq!(QrCodec::ec_level_for(0.0), EcLevel::L);
    }

    #[test]
    fn test_empty_input_rejected() {
        let codec = QrCodec::new();
        assert!(matches!(
            codec.encode("", &EncodingOptions::default()),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_capacity_boundary() {
        let codec = QrCodec::new();
        let opts = EncodingOptions::default();

        // Exactly at the ceiling: succeeds (steps down to level L).
        let at_limit = "a".repeat(QR_MAX_BYTES);
        assert!(codec.encode(&at_limit, &opts).is_ok());

        // One byte past: fails with the numeric values attached.
        let past_limit = "a".repeat(QR_MAX_BYTES + 1);
        match codec.encode(&past_limit, &opts) {
            Err(CodecError::CapacityExceeded { requested, maximum }) => {
                assert_eq!(requested, QR_MAX_BYTES + 1);
                assert_eq!(maximum, QR_MAX_BYTES);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip_url() {
        let codec = QrCodec::new();
        let encoded = codec
            .encode("https://example.com", &EncodingOptions::default())
            .unwrap();
        let Artifact::Image(image) = &encoded.artifact else {
            panic!("expected image artifact");
        };

        let decoded = codec.decode(image).unwrap();
        assert_eq!(decoded.text, "https://example.com");
        assert!(decoded.confidence > 0.95);
    }

    #[test]
    fn test_metadata_reports_level() {
        let codec = QrCodec::new();
        let opts = EncodingOptions {
            quality_target: 0.95,
            ..Default::default()
        };
        let result = codec.encode("short", &opts).unwrap();
        assert_eq!(result.metadata.get("ec_level").unwrap(), "H");
    }
}
