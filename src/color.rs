/// Packed colour utilities
///
/// Markings store their colours as packed 32-bit ARGB values so they survive
/// the round trip through SQLite unchanged. This module handles:
/// - Packing/unpacking ARGB
/// - The preset palettes offered when editing a marking
/// - Source-over blending onto RGBA pixels

use image::Rgba;

/// Opaque red, the default line colour
pub const RED: u32 = 0xFFFF_0000;
pub const GREEN: u32 = 0xFF00_FF00;
pub const BLUE: u32 = 0xFF00_00FF;
pub const YELLOW: u32 = 0xFFFF_FF00;
pub const MAGENTA: u32 = 0xFFFF_00FF;
pub const CYAN: u32 = 0xFF00_FFFF;
/// Opaque white, the default label colour
pub const WHITE: u32 = 0xFFFF_FFFF;
pub const BLACK: u32 = 0xFF00_0000;

/// Semi-transparent black behind distance labels
pub const LABEL_BACKGROUND: u32 = argb(180, 0, 0, 0);

/// Colours offered for the marking line
pub const LINE_COLOR_PRESETS: [u32; 6] = [RED, BLUE, GREEN, YELLOW, MAGENTA, CYAN];

/// Colours offered for the distance label
pub const TEXT_COLOR_PRESETS: [u32; 3] = [WHITE, BLACK, YELLOW];

/// Pack four channels into an ARGB word
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Alpha channel of a packed colour
pub const fn alpha(color: u32) -> u8 {
    (color >> 24) as u8
}

/// Convert packed ARGB into an `image` pixel
pub fn to_rgba(color: u32) -> Rgba<u8> {
    Rgba([
        (color >> 16) as u8,
        (color >> 8) as u8,
        color as u8,
        alpha(color),
    ])
}

/// Blend `color` over `dst` with an extra coverage factor in [0, 1]
///
/// Integer arithmetic, so live preview and export produce the same pixels.
pub fn blend_over(dst: Rgba<u8>, color: u32, coverage: f32) -> Rgba<u8> {
    let coverage = (coverage.clamp(0.0, 1.0) * 255.0).round() as u32;
    // Effective source alpha in 0..=255
    let a = (alpha(color) as u32 * coverage + 127) / 255;
    if a == 0 {
        return dst;
    }
    let src = to_rgba(color);
    let inv = 255 - a;
    let mix = |d: u8, s: u8| ((d as u32 * inv + s as u32 * a + 127) / 255) as u8;
    Rgba([
        mix(dst[0], src[0]),
        mix(dst[1], src[1]),
        mix(dst[2], src[2]),
        (a + (dst[3] as u32 * inv + 127) / 255).min(255) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_and_unpack() {
        assert_eq!(argb(0xFF, 0xFF, 0, 0), RED);
        assert_eq!(to_rgba(LABEL_BACKGROUND), Rgba([0, 0, 0, 180]));
        assert_eq!(to_rgba(CYAN), Rgba([0, 255, 255, 255]));
    }

    #[test]
    fn test_opaque_full_coverage_replaces_pixel() {
        let out = blend_over(Rgba([10, 20, 30, 255]), RED, 1.0);
        assert_eq!(out, Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_zero_coverage_keeps_pixel() {
        let dst = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_over(dst, RED, 0.0), dst);
    }

    #[test]
    fn test_translucent_background_darkens() {
        let out = blend_over(Rgba([255, 255, 255, 255]), LABEL_BACKGROUND, 1.0);
        // 180/255 black over white leaves roughly 29% brightness
        assert_eq!(out[0], 75);
        assert_eq!(out[3], 255);
    }
}
