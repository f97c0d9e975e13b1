//! sRGB transfer function.
//!
//! The sRGB standard combines a linear segment near black with a power
//! curve (approximately gamma 2.2) for the rest.
//!
//! # Range
//!
//! - Encode input is clamped to [0, 1]; decode input/output are [0, 1]
//!
//! # Reference
//!
//! IEC 61966-2-1:1999

use revela_core::{LinearImage, Rgba8Buffer};

/// Encodes linear light to gamma-encoded sRGB.
///
/// # Formula
///
/// ```text
/// if L <= 0.0031308:
///     V = L * 12.92
/// else:
///     V = 1.055 * L^(1/2.4) - 0.055
/// ```
#[inline]
pub fn linear_to_srgb(l: f32) -> f32 {
    if l <= 0.003_130_8 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Decodes gamma-encoded sRGB to linear light.
///
/// # Formula
///
/// ```text
/// if V <= 0.04045:
///     L = V / 12.92
/// else:
///     L = ((V + 0.055) / 1.055)^2.4
/// ```
#[inline]
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Encodes a linear triplet to sRGB.
#[inline]
pub fn linear_to_srgb_rgb(rgb: [f32; 3]) -> [f32; 3] {
    [
        linear_to_srgb(rgb[0]),
        linear_to_srgb(rgb[1]),
        linear_to_srgb(rgb[2]),
    ]
}

/// Decodes an sRGB triplet to linear.
#[inline]
pub fn srgb_to_linear_rgb(rgb: [f32; 3]) -> [f32; 3] {
    [
        srgb_to_linear(rgb[0]),
        srgb_to_linear(rgb[1]),
        srgb_to_linear(rgb[2]),
    ]
}

/// Quantizes one encoded value to 8 bits, round-to-nearest.
#[inline]
fn quantize8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Encodes a linear image to an 8-bit sRGB buffer without dithering.
///
/// Values are clamped to [0, 1] at the encode; anything the tone stages
/// left above 1.0 clips to white here.
pub fn encode_image(img: &LinearImage) -> Rgba8Buffer {
    let (w, h) = img.dimensions();
    let mut out = Rgba8Buffer::new(w, h);
    let (r, g, b) = img.planes();
    for (i, px) in out.data_mut().chunks_exact_mut(4).enumerate() {
        px[0] = quantize8(linear_to_srgb(r[i].max(0.0)));
        px[1] = quantize8(linear_to_srgb(g[i].max(0.0)));
        px[2] = quantize8(linear_to_srgb(b[i].max(0.0)));
        px[3] = 255;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for i in 0..=1000 {
            let v = i as f32 / 1000.0;
            let back = linear_to_srgb(srgb_to_linear(v));
            assert!((v - back).abs() < 1e-3, "v={v}, back={back}");
        }
    }

    #[test]
    fn test_roundtrip_other_direction() {
        for i in 0..=1000 {
            let l = i as f32 / 1000.0;
            let back = srgb_to_linear(linear_to_srgb(l));
            assert!((l - back).abs() < 1e-3, "l={l}, back={back}");
        }
    }

    #[test]
    fn test_boundaries() {
        use approx::assert_relative_eq;

        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert_relative_eq!(linear_to_srgb(1.0), 1.0, epsilon = 1e-6);
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert_relative_eq!(srgb_to_linear(1.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_midpoint() {
        // sRGB 0.5 is approximately 0.214 linear.
        assert!((srgb_to_linear(0.5) - 0.214).abs() < 0.01);
    }

    #[test]
    fn test_linear_segment_continuity() {
        // The two segments meet at the breakpoint without a jump.
        let below = linear_to_srgb(0.003_130_7);
        let above = linear_to_srgb(0.003_130_9);
        assert!((below - above).abs() < 1e-4);
    }

    #[test]
    fn test_encode_clips_overbright() {
        let img = LinearImage::filled(2, 2, [2.5, 1.0, 0.0]);
        let buf = encode_image(&img);
        assert_eq!(buf.pixel(0, 0), [255, 255, 0, 255]);
    }

    #[test]
    fn test_encode_midgray() {
        let img = LinearImage::filled(1, 1, [0.214, 0.214, 0.214]);
        let buf = encode_image(&img);
        let px = buf.pixel(0, 0);
        assert!((px[0] as i32 - 128).abs() <= 1, "got {}", px[0]);
    }
}
