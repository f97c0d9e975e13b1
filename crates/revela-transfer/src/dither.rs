//! Floyd–Steinberg error-diffusion encoding.
//!
//! Quantizing a smooth gradient straight to 8 bits leaves visible
//! banding; diffusing each pixel's rounding residue into its unvisited
//! neighbors trades banding for unstructured noise. Weights are the
//! classic Floyd–Steinberg quartet:
//!
//! ```text
//!           *    7/16
//!   3/16  5/16   1/16
//! ```
//!
//! Rows are processed top-to-bottom, pixels left-to-right; neighbors
//! outside the image are skipped, never wrapped. The pass is fully
//! deterministic: identical input and flags give byte-identical output.

use revela_core::{LinearImage, Rgba8Buffer};

use crate::srgb::linear_to_srgb;

const W_RIGHT: f32 = 7.0 / 16.0;
const W_BELOW_LEFT: f32 = 3.0 / 16.0;
const W_BELOW: f32 = 5.0 / 16.0;
const W_BELOW_RIGHT: f32 = 1.0 / 16.0;

/// Encodes a linear image to 8-bit RGBA with error diffusion.
///
/// When `gamma_encode` is set each sample passes through the sRGB
/// transfer function before quantization (the normal display path);
/// otherwise the linear values are quantized directly.
pub fn encode_dithered(img: &LinearImage, gamma_encode: bool) -> Rgba8Buffer {
    encode_dithered_depth(img, gamma_encode, 8)
}

/// Encodes with error diffusion at an explicit target bit depth.
///
/// `bits` must be in `1..=8`; the output still occupies one byte per
/// channel, scaled to the full 0–255 range.
pub fn encode_dithered_depth(img: &LinearImage, gamma_encode: bool, bits: u32) -> Rgba8Buffer {
    debug_assert!((1..=8).contains(&bits), "target depth out of range");
    let (w, h) = img.dimensions();
    let mut out = Rgba8Buffer::new(w, h);
    if img.is_empty() {
        return out;
    }

    let levels = ((1u32 << bits) - 1) as f32;
    let (r, g, b) = img.planes();
    for (c, plane) in [r, g, b].into_iter().enumerate() {
        diffuse_plane(plane, w, h, gamma_encode, levels, bits, c, &mut out);
    }
    out
}

/// Runs the diffusion over one channel plane.
#[allow(clippy::too_many_arguments)]
fn diffuse_plane(
    plane: &[f32],
    w: u32,
    h: u32,
    gamma_encode: bool,
    levels: f32,
    bits: u32,
    channel: usize,
    out: &mut Rgba8Buffer,
) {
    let width = w as usize;
    // Two row-sized error buffers, swapped as the scan advances a row.
    let mut err_cur = vec![0.0f32; width];
    let mut err_next = vec![0.0f32; width];

    for y in 0..h as usize {
        err_next.fill(0.0);
        for x in 0..width {
            let v = plane[y * width + x].max(0.0);
            let encoded = if gamma_encode { linear_to_srgb(v) } else { v };
            let with_err = (encoded + err_cur[x]).clamp(0.0, 1.0);

            let level = (with_err * levels + 0.5).floor().min(levels);
            let quantized = level / levels;
            let residual = with_err - quantized;

            let byte = if bits == 8 {
                level as u8
            } else {
                // Expand the reduced depth to the full byte range.
                (quantized * 255.0 + 0.5) as u8
            };
            set_channel(out, x as u32, y as u32, channel, byte);

            if x + 1 < width {
                err_cur[x + 1] += residual * W_RIGHT;
                err_next[x + 1] += residual * W_BELOW_RIGHT;
            }
            if x > 0 {
                err_next[x - 1] += residual * W_BELOW_LEFT;
            }
            err_next[x] += residual * W_BELOW;
        }
        std::mem::swap(&mut err_cur, &mut err_next);
    }
}

#[inline]
fn set_channel(out: &mut Rgba8Buffer, x: u32, y: u32, channel: usize, value: u8) {
    let w = out.width() as usize;
    let i = (y as usize * w + x as usize) * 4 + channel;
    out.data_mut()[i] = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srgb::encode_image;

    fn gradient(w: u32, h: u32) -> LinearImage {
        let mut img = LinearImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = x as f32 / (w - 1) as f32 * 0.02 + 0.1;
                img.set_pixel(x, y, [v, v, v]);
            }
        }
        img
    }

    #[test]
    fn test_deterministic() {
        let img = gradient(64, 16);
        let a = encode_dithered(&img, true);
        let b = encode_dithered(&img, true);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_flags_change_output() {
        let img = gradient(64, 16);
        let gamma = encode_dithered(&img, true);
        let linear = encode_dithered(&img, false);
        assert_ne!(gamma.data(), linear.data());
    }

    #[test]
    fn test_mean_preserved_on_flat_field() {
        // Diffusion redistributes error; over a flat region the average
        // output must stay close to the exact encoded value.
        let img = LinearImage::filled(64, 64, [0.2, 0.2, 0.2]);
        let buf = encode_dithered(&img, true);
        let mean: f64 = buf
            .data()
            .chunks_exact(4)
            .map(|px| px[0] as f64)
            .sum::<f64>()
            / (64.0 * 64.0);
        let exact = linear_to_srgb(0.2) as f64 * 255.0;
        assert!((mean - exact).abs() < 1.0, "mean={mean}, exact={exact}");
    }

    #[test]
    fn test_extremes_stay_clamped() {
        let img = LinearImage::filled(8, 8, [0.0, 5.0, 1.0]);
        let buf = encode_dithered(&img, true);
        for px in buf.data().chunks_exact(4) {
            assert_eq!(px[0], 0);
            assert_eq!(px[1], 255);
            assert_eq!(px[2], 255);
        }
    }

    #[test]
    fn test_single_pixel_image_no_neighbor_access() {
        let img = LinearImage::filled(1, 1, [0.37, 0.37, 0.37]);
        let buf = encode_dithered(&img, true);
        // Just must not panic; the value matches the undithered encode.
        assert_eq!(buf.pixel(0, 0), encode_image(&img).pixel(0, 0));
    }

    #[test]
    fn test_reduced_depth_spans_byte_range() {
        let img = LinearImage::filled(4, 4, [1.0, 1.0, 1.0]);
        let buf = encode_dithered_depth(&img, false, 4);
        assert_eq!(buf.pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_reduces_banding_versus_plain_quantize() {
        // On a shallow gradient, plain quantization produces long runs of
        // identical bytes; dithering breaks them up. Count distinct values
        // along a row as a cheap banding proxy.
        let img = gradient(256, 8);
        let plain = encode_image(&img);
        let dithered = encode_dithered(&img, true);

        let distinct = |buf: &Rgba8Buffer| {
            let mut vals: Vec<u8> = buf.data().chunks_exact(4).map(|p| p[0]).collect();
            vals.sort_unstable();
            vals.dedup();
            vals.len()
        };
        assert!(distinct(&dithered) >= distinct(&plain));
    }
}
