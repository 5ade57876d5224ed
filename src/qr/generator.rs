//! QR matrix rendering.
//!
//! Scales the module grid into a grayscale image. The module pixel size
//! grows with the quality target and shrinks with the speed target, with
//! a floor that keeps the symbol legible to detectors.

use image::GrayImage;
use qrcode::{Color, QrCode};

/// Smallest legible module size in pixels.
pub const MIN_MODULE_PX: u32 = 3;

/// Quiet zone around the symbol, in modules.
const QUIET_MODULES: u32 = 4;

/// Module pixel scale for the given quality/speed targets.
pub fn module_scale(quality_target: f64, speed_target: f64) -> u32 {
    let scaled = 6.0 + quality_target * 6.0 - speed_target * 4.0;
    (scaled.round() as i64).max(MIN_MODULE_PX as i64) as u32
}

/// Renders a QR code into a grayscale image at the given module scale,
/// with a standard quiet zone.
pub fn render(code: &QrCode, module_px: u32) -> GrayImage {
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let total = (modules + 2 * QUIET_MODULES) * module_px;

    let mut image = GrayImage::from_pixel(total, total, image::Luma([255u8]));
    for (idx, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = (idx as u32 % modules + QUIET_MODULES) * module_px;
        let my = (idx as u32 / modules + QUIET_MODULES) * module_px;
        for dy in 0..module_px {
            for dx in 0..module_px {
                image.put_pixel(mx + dx, my + dy, image::Luma([0u8]));
            }
        }
    }
    image
}
