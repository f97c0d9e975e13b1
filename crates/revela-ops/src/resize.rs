//! Bilinear resampling.
//!
//! Used by the fast bilateral path (downsample, filter, upsample) and by
//! the preview resolution ladder. Sampling clamps at the borders, so the
//! output never reads outside the source.

use revela_core::LinearImage;

use crate::parallel::par_produce_pixels;

/// Resizes an image to `new_w` × `new_h` with bilinear interpolation.
///
/// Degenerate targets (zero area) return an empty image; a same-size
/// target returns a plain copy.
pub fn resize_bilinear(src: &LinearImage, new_w: u32, new_h: u32) -> LinearImage {
    if new_w == 0 || new_h == 0 || src.is_empty() {
        return LinearImage::new(new_w, new_h);
    }
    if src.dimensions() == (new_w, new_h) {
        return src.clone();
    }

    let (sw, sh) = src.dimensions();
    // Pixel-center mapping keeps the first and last samples aligned.
    let scale_x = sw as f32 / new_w as f32;
    let scale_y = sh as f32 / new_h as f32;

    let mut out = LinearImage::new(new_w, new_h);
    par_produce_pixels(&mut out, |x, y| {
        let sx = (x as f32 + 0.5) * scale_x - 0.5;
        let sy = (y as f32 + 0.5) * scale_y - 0.5;
        sample_bilinear(src, sx, sy)
    });
    out
}

/// Downsamples by an integer factor (box-free, plain bilinear).
pub fn downsample(src: &LinearImage, factor: u32) -> LinearImage {
    debug_assert!(factor >= 1, "downsample factor must be positive");
    let (w, h) = src.dimensions();
    resize_bilinear(src, (w / factor).max(1), (h / factor).max(1))
}

/// Scales an image so its longest side is at most `max_dim`.
///
/// Images already within the bound are returned unchanged.
pub fn fit_to(src: &LinearImage, max_dim: u32) -> LinearImage {
    let (w, h) = src.dimensions();
    let longest = w.max(h);
    if longest <= max_dim || longest == 0 {
        return src.clone();
    }
    let scale = max_dim as f32 / longest as f32;
    resize_bilinear(
        src,
        ((w as f32 * scale).round() as u32).max(1),
        ((h as f32 * scale).round() as u32).max(1),
    )
}

/// Bilinear sample at fractional source coordinates, border-clamped.
#[inline]
pub fn sample_bilinear(src: &LinearImage, sx: f32, sy: f32) -> [f32; 3] {
    let (w, h) = src.dimensions();
    let max_x = (w - 1) as f32;
    let max_y = (h - 1) as f32;

    let cx = sx.clamp(0.0, max_x);
    let cy = sy.clamp(0.0, max_y);

    let x0 = cx.floor() as u32;
    let y0 = cy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = cx - x0 as f32;
    let fy = cy - y0 as f32;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bot = p01[c] + (p11[c] - p01[c]) * fx;
        out[c] = top + (bot - top) * fy;
    }
    out
}
