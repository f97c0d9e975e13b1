//! Details stage kernel: unsharp-mask sharpening and edge-preserving
//! noise reduction.
//!
//! Sharpening subtracts a separable Gaussian blur and adds the scaled
//! residual back. Noise reduction runs the bilateral filter and blends
//! toward the filtered image by strength, so edges stay put while flat
//! regions smooth out.

use revela_core::LinearImage;
use revela_params::AdjustmentParameters;

use crate::bilateral::{bilateral_blend, bilateral_fast};
use crate::effects::BilateralFn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Residual gain at full sharpening.
const SHARPEN_RANGE: f32 = 2.0;

/// Noise-reduction spatial sigma at zero strength.
const NR_SIGMA_BASE: f32 = 1.5;

/// Additional spatial sigma at full strength.
const NR_SIGMA_RANGE: f32 = 2.5;

/// Noise-reduction range sigma at zero strength.
const NR_RANGE_BASE: f32 = 0.05;

/// Additional range sigma at full strength.
const NR_RANGE_RANGE: f32 = 0.15;

/// Parameters for the details transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailsParams {
    /// Unsharp-mask strength in `[0, 1]`.
    pub sharpening: f32,
    /// Unsharp-mask radius (Gaussian sigma) in pixels.
    pub sharpen_radius: f32,
    /// Noise-reduction strength in `[0, 1]`.
    pub noise_reduction: f32,
}

impl DetailsParams {
    /// Extracts the details subset from a full snapshot.
    pub fn from_snapshot(p: &AdjustmentParameters) -> Self {
        Self {
            sharpening: p.sharpening,
            sharpen_radius: p.sharpen_radius,
            noise_reduction: p.noise_reduction,
        }
    }

    /// Identity (no change).
    pub fn identity() -> Self {
        Self {
            sharpening: 0.0,
            sharpen_radius: 1.5,
            noise_reduction: 0.0,
        }
    }

    /// Check if this is identity (no-op).
    ///
    /// The radius alone does not matter while sharpening is off.
    pub fn is_identity(&self) -> bool {
        self.sharpening == 0.0 && self.noise_reduction == 0.0
    }
}

/// Applies the details transform using the default CPU bilateral path.
pub fn apply_details(img: &mut LinearImage, details: &DetailsParams) {
    apply_details_with(img, details, &|src, ss, rs| bilateral_fast(src, ss, rs));
}

/// Applies the details transform with a caller-supplied bilateral filter.
///
/// Noise reduction runs before sharpening so the residual pass does not
/// re-amplify the noise it just removed.
pub fn apply_details_with(img: &mut LinearImage, details: &DetailsParams, bilateral: BilateralFn<'_>) {
    if details.is_identity() || img.is_empty() {
        return;
    }

    if details.noise_reduction > 0.0 {
        let nr = details.noise_reduction.clamp(0.0, 1.0);
        let filtered = bilateral(
            img,
            NR_SIGMA_BASE + NR_SIGMA_RANGE * nr,
            NR_RANGE_BASE + NR_RANGE_RANGE * nr,
        );
        *img = bilateral_blend(img, &filtered, nr);
    }

    if details.sharpening > 0.0 {
        unsharp_mask(img, details.sharpening, details.sharpen_radius.max(0.1));
    }
}

/// Sharpens by adding the scaled blur residual back.
fn unsharp_mask(img: &mut LinearImage, amount: f32, sigma: f32) {
    let blurred = gaussian_blur(img, sigma);
    let gain = amount.clamp(0.0, 1.0) * SHARPEN_RANGE;
    let (r, g, b) = img.planes_mut();
    let (br, bg, bb) = blurred.planes();
    for i in 0..r.len() {
        r[i] = (r[i] + gain * (r[i] - br[i])).max(0.0);
        g[i] = (g[i] + gain * (g[i] - bg[i])).max(0.0);
        b[i] = (b[i] + gain * (b[i] - bb[i])).max(0.0);
    }
}

/// Separable Gaussian blur with border clamping.
pub fn gaussian_blur(src: &LinearImage, sigma: f32) -> LinearImage {
    if src.is_empty() || sigma <= 0.0 {
        return src.clone();
    }
    let radius = (3.0 * sigma).ceil() as i32;
    let weights = gaussian_weights(sigma, radius);
    let horizontal = blur_pass(src, &weights, radius, true);
    blur_pass(&horizontal, &weights, radius, false)
}

/// Normalized 1-D Gaussian taps for `[-radius, radius]`.
fn gaussian_weights(sigma: f32, radius: i32) -> Vec<f32> {
    let inv_2s2 = 1.0 / (2.0 * sigma * sigma);
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|d| (-(d * d) as f32 * inv_2s2).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// One separable pass; rows partitioned across workers.
fn blur_pass(src: &LinearImage, weights: &[f32], radius: i32, horizontal: bool) -> LinearImage {
    let (w, h) = src.dimensions();
    let width = w as usize;
    let mut out = LinearImage::new(w, h);

    let (or, og, ob) = out.planes_mut();
    let row_op = |y: usize, rr: &mut [f32], gr: &mut [f32], br: &mut [f32]| {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (k, &weight) in weights.iter().enumerate() {
                let d = k as i32 - radius;
                let (sx, sy) = if horizontal {
                    ((x as i32 + d).clamp(0, w as i32 - 1), y as i32)
                } else {
                    (x as i32, (y as i32 + d).clamp(0, h as i32 - 1))
                };
                let px = src.pixel(sx as u32, sy as u32);
                acc[0] += px[0] * weight;
                acc[1] += px[1] * weight;
                acc[2] += px[2] * weight;
            }
            rr[x] = acc[0];
            gr[x] = acc[1];
            br[x] = acc[2];
        }
    };

    #[cfg(feature = "parallel")]
    or.par_chunks_mut(width)
        .zip(og.par_chunks_mut(width))
        .zip(ob.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, ((rr, gr), br))| row_op(y, rr, gr, br));
    #[cfg(not(feature = "parallel"))]
    or.chunks_mut(width)
        .zip(og.chunks_mut(width))
        .zip(ob.chunks_mut(width))
        .enumerate()
        .for_each(|(y, ((rr, gr), br))| row_op(y, rr, gr, br));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_edge(w: u32, h: u32) -> LinearImage {
        let mut img = LinearImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if x < w / 2 { 0.2 } else { 0.8 };
                img.set_pixel(x, y, [v, v, v]);
            }
        }
        img
    }

    #[test]
    fn identity_is_noop() {
        let details = DetailsParams::identity();
        assert!(details.is_identity());
        let mut img = step_edge(16, 16);
        let before = img.clone();
        apply_details(&mut img, &details);
        assert_eq!(img, before);
    }

    #[test]
    fn radius_alone_is_identity() {
        let details = DetailsParams {
            sharpen_radius: 5.0,
            ..DetailsParams::identity()
        };
        assert!(details.is_identity());
    }

    #[test]
    fn gaussian_blur_preserves_flat_field() {
        let img = LinearImage::filled(16, 16, [0.4, 0.5, 0.6]);
        let out = gaussian_blur(&img, 2.0);
        for y in 0..16 {
            for x in 0..16 {
                let px = out.pixel(x, y);
                assert!((px[0] - 0.4).abs() < 1e-5);
                assert!((px[1] - 0.5).abs() < 1e-5);
                assert!((px[2] - 0.6).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn gaussian_blur_softens_edge() {
        let img = step_edge(32, 8);
        let out = gaussian_blur(&img, 2.0);
        let left = out.pixel(15, 4)[0];
        let right = out.pixel(16, 4)[0];
        assert!(right - left < 0.3, "edge should soften: {left} vs {right}");
    }

    #[test]
    fn sharpening_overshoots_at_edge() {
        let mut img = step_edge(32, 8);
        let details = DetailsParams {
            sharpening: 1.0,
            sharpen_radius: 1.5,
            ..DetailsParams::identity()
        };
        apply_details(&mut img, &details);
        // Classic unsharp halo: undershoot on the dark side, overshoot
        // on the bright side.
        assert!(img.pixel(14, 4)[0] < 0.2);
        assert!(img.pixel(17, 4)[0] > 0.8);
        // Far from the edge nothing changes.
        assert!((img.pixel(2, 4)[0] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn noise_reduction_smooths_noise() {
        let mut img = LinearImage::new(32, 32);
        for y in 0..32 {
            for x in 0..32 {
                let n = ((x * 7 + y * 13) % 11) as f32 / 11.0 - 0.5;
                let v = 0.5 + n * 0.2;
                img.set_pixel(x, y, [v, v, v]);
            }
        }
        let spread_before = spread(&img);
        let details = DetailsParams {
            noise_reduction: 1.0,
            ..DetailsParams::identity()
        };
        apply_details(&mut img, &details);
        assert!(spread(&img) < spread_before * 0.5);
    }

    #[test]
    fn zero_strength_noise_reduction_is_noop() {
        let mut img = step_edge(16, 16);
        let before = img.clone();
        let details = DetailsParams {
            noise_reduction: 0.0,
            sharpening: 0.0,
            ..DetailsParams::identity()
        };
        apply_details(&mut img, &details);
        assert_eq!(img, before);
    }

    fn spread(img: &LinearImage) -> f32 {
        let r = img.r();
        let mean = r.iter().sum::<f32>() / r.len() as f32;
        r.iter().map(|v| (v - mean).abs()).sum::<f32>() / r.len() as f32
    }
}
