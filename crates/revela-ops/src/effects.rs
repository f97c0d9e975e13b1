//! Effects stage kernel: clarity, texture, dehaze, vignette, and film
//! grain.
//!
//! Clarity and texture are local-contrast boosts built on the bilateral
//! filter: the filtered image is the low-frequency base, the residual is
//! amplified and added back. Clarity works at a coarse scale, texture at
//! a fine one, and the edge-preserving base keeps halos off hard edges.

use revela_core::{LinearImage, luminance};
use revela_params::AdjustmentParameters;

use crate::bilateral::bilateral_fast;
use crate::parallel::{par_map_pixels, par_map_pixels_xy};
use crate::util::smoothstep;

/// Coarse spatial sigma for clarity, as a fraction of the image diagonal.
const CLARITY_SIGMA_FRAC: f32 = 0.01;

/// Fine spatial sigma for texture, in pixels.
const TEXTURE_SIGMA: f32 = 2.0;

/// Range sigma for the local-contrast bases.
const LOCAL_CONTRAST_RANGE_SIGMA: f32 = 0.25;

/// Assumed airlight level for dehaze.
const DEHAZE_AIRLIGHT: f32 = 0.95;

/// Strongest haze fraction removable (or addable) at full slider.
const DEHAZE_RANGE: f32 = 0.35;

/// Fraction of the corner distance where vignette falloff begins.
const VIGNETTE_ONSET: f32 = 0.6;

/// Peak grain amplitude at full slider.
const GRAIN_RANGE: f32 = 0.12;

/// Parameters for the effects transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectsParams {
    /// Coarse local contrast in `[-1, 1]`.
    pub clarity: f32,
    /// Fine local contrast in `[-1, 1]`.
    pub texture: f32,
    /// Haze removal in `[-1, 1]`; negative adds haze.
    pub dehaze: f32,
    /// Vignette strength; negative darkens corners.
    pub vignette_amount: f32,
    /// Grain strength in `[0, 1]`.
    pub grain_amount: f32,
    /// Grain pattern seed.
    pub grain_seed: u32,
}

impl EffectsParams {
    /// Extracts the effects subset from a full snapshot.
    pub fn from_snapshot(p: &AdjustmentParameters) -> Self {
        Self {
            clarity: p.clarity,
            texture: p.texture,
            dehaze: p.dehaze,
            vignette_amount: p.vignette_amount,
            grain_amount: p.grain_amount,
            grain_seed: p.grain_seed,
        }
    }

    /// Identity (no change).
    pub fn identity() -> Self {
        Self {
            clarity: 0.0,
            texture: 0.0,
            dehaze: 0.0,
            vignette_amount: 0.0,
            grain_amount: 0.0,
            grain_seed: 0,
        }
    }

    /// Check if this is identity (no-op).
    ///
    /// The seed alone does not matter while grain is off.
    pub fn is_identity(&self) -> bool {
        self.clarity == 0.0
            && self.texture == 0.0
            && self.dehaze == 0.0
            && self.vignette_amount == 0.0
            && self.grain_amount == 0.0
    }
}

/// Bilateral dispatch hook for the local-contrast bases.
///
/// The engine routes this through its configured dispatcher (fast/GPU);
/// standalone callers get the plain CPU fast path via [`apply_effects`].
pub type BilateralFn<'a> = &'a dyn Fn(&LinearImage, f32, f32) -> LinearImage;

/// Applies the effects transform using the default CPU bilateral path.
pub fn apply_effects(img: &mut LinearImage, fx: &EffectsParams) {
    apply_effects_with(img, fx, &|src, ss, rs| bilateral_fast(src, ss, rs));
}

/// Applies the effects transform with a caller-supplied bilateral filter.
pub fn apply_effects_with(img: &mut LinearImage, fx: &EffectsParams, bilateral: BilateralFn<'_>) {
    if fx.is_identity() || img.is_empty() {
        return;
    }

    if fx.clarity != 0.0 {
        let (w, h) = img.dimensions();
        let diag = ((w * w + h * h) as f32).sqrt();
        let sigma = (diag * CLARITY_SIGMA_FRAC).max(2.0);
        local_contrast(img, fx.clarity, sigma, bilateral);
    }
    if fx.texture != 0.0 {
        local_contrast(img, fx.texture, TEXTURE_SIGMA, bilateral);
    }
    if fx.dehaze != 0.0 {
        apply_dehaze(img, fx.dehaze);
    }
    if fx.vignette_amount != 0.0 {
        apply_vignette(img, fx.vignette_amount);
    }
    if fx.grain_amount > 0.0 {
        apply_grain(img, fx.grain_amount, fx.grain_seed);
    }
}

/// Adds back an amplified bilateral residual.
fn local_contrast(img: &mut LinearImage, amount: f32, sigma: f32, bilateral: BilateralFn<'_>) {
    let base = bilateral(img, sigma, LOCAL_CONTRAST_RANGE_SIGMA);
    let gain = amount * 1.5;
    let (r, g, b) = img.planes_mut();
    let (br, bg, bb) = base.planes();
    for i in 0..r.len() {
        r[i] = (r[i] + gain * (r[i] - br[i])).max(0.0);
        g[i] = (g[i] + gain * (g[i] - bg[i])).max(0.0);
        b[i] = (b[i] + gain * (b[i] - bb[i])).max(0.0);
    }
}

/// Haze model: `observed = t · scene + (1 − t) · airlight`.
///
/// A positive slider assumes a uniform transmission deficit and inverts
/// the model; a negative slider runs it forward, adding haze.
fn apply_dehaze(img: &mut LinearImage, amount: f32) {
    let haze = amount.clamp(-1.0, 1.0) * DEHAZE_RANGE;
    let t = (1.0 - haze).clamp(0.2, 2.0);
    par_map_pixels(img, move |rgb| {
        [
            ((rgb[0] - DEHAZE_AIRLIGHT * (1.0 - t)) / t).max(0.0),
            ((rgb[1] - DEHAZE_AIRLIGHT * (1.0 - t)) / t).max(0.0),
            ((rgb[2] - DEHAZE_AIRLIGHT * (1.0 - t)) / t).max(0.0),
        ]
    });
}

/// Radial gain: unity inside [`VIGNETTE_ONSET`] of the corner distance,
/// cubic-smoothstep falloff beyond. Sign selects darken/brighten.
fn apply_vignette(img: &mut LinearImage, amount: f32) {
    let (w, h) = img.dimensions();
    let cx = (w as f32 - 1.0) * 0.5;
    let cy = (h as f32 - 1.0) * 0.5;
    let corner = (cx * cx + cy * cy).sqrt().max(1e-6);

    par_map_pixels_xy(img, move |x, y, rgb| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let d = (dx * dx + dy * dy).sqrt() / corner;
        let falloff = smoothstep(VIGNETTE_ONSET, 1.0, d);
        let gain = (1.0 + amount * falloff).max(0.0);
        [rgb[0] * gain, rgb[1] * gain, rgb[2] * gain]
    });
}

/// Hash-noise film grain.
///
/// Per-channel noise (seeded separately per channel so the pattern is
/// chromatic, like dye clouds) scaled by a parabolic luminance weight:
/// strongest in deep shadows and highlights, weakest at mid-gray.
fn apply_grain(img: &mut LinearImage, amount: f32, seed: u32) {
    let amplitude = amount.clamp(0.0, 1.0) * GRAIN_RANGE;
    par_map_pixels_xy(img, move |x, y, rgb| {
        let weight = grain_weight(luminance(rgb));
        let mut out = rgb;
        for (c, v) in out.iter_mut().enumerate() {
            let n = hash_noise(x, y, seed.wrapping_add(c as u32));
            *v = (*v + n * amplitude * weight).max(0.0);
        }
        out
    });
}

/// Parabolic luminance weight centered at mid-gray.
#[inline]
fn grain_weight(luma: f32) -> f32 {
    let d = luma.clamp(0.0, 1.0) - 0.5;
    0.5 + 2.0 * d * d
}

/// Deterministic per-pixel noise in `[-1, 1]`.
///
/// Integer finalizer in the murmur3/PCG family; consecutive coordinates
/// decorrelate fully, and the same `(x, y, seed)` always produces the
/// same value.
#[inline]
fn hash_noise(x: u32, y: u32, seed: u32) -> f32 {
    let mut state = x
        .wrapping_mul(0x9E37_79B9)
        .wrapping_add(y.wrapping_mul(0x85EB_CA6B))
        .wrapping_add(seed.wrapping_mul(0xC2B2_AE35));
    state ^= state >> 16;
    state = state.wrapping_mul(0x7FEB_352D);
    state ^= state >> 15;
    state = state.wrapping_mul(0x846C_A68B);
    state ^= state >> 16;
    (state as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_leaves_image_untouched() {
        let fx = EffectsParams::identity();
        assert!(fx.is_identity());
        let mut img = LinearImage::filled(8, 8, [0.3, 0.5, 0.7]);
        let before = img.clone();
        apply_effects(&mut img, &fx);
        assert_eq!(img, before);
    }

    #[test]
    fn seed_alone_is_still_identity() {
        let fx = EffectsParams {
            grain_seed: 99,
            ..EffectsParams::identity()
        };
        assert!(fx.is_identity());
    }

    #[test]
    fn clarity_amplifies_local_contrast() {
        // Half dark, half bright; clarity should push the halves apart
        // near the edge.
        let mut img = LinearImage::new(32, 32);
        for y in 0..32 {
            for x in 0..32 {
                let v = if x < 16 { 0.3 } else { 0.6 };
                img.set_pixel(x, y, [v, v, v]);
            }
        }
        let flat_dark = img.pixel(2, 16)[0];
        let fx = EffectsParams {
            clarity: 1.0,
            ..EffectsParams::identity()
        };
        apply_effects(&mut img, &fx);
        // Near the boundary, dark side darker and bright side brighter.
        assert!(img.pixel(14, 16)[0] <= flat_dark + 1e-6);
        assert!(img.pixel(17, 16)[0] >= 0.6 - 1e-6);
    }

    #[test]
    fn dehaze_increases_contrast() {
        let mut img = LinearImage::filled(4, 4, [0.5, 0.5, 0.5]);
        let fx = EffectsParams {
            dehaze: 1.0,
            ..EffectsParams::identity()
        };
        apply_effects(&mut img, &fx);
        // Mid-gray sits below airlight, so removing haze darkens it.
        assert!(img.pixel(0, 0)[0] < 0.5);

        let mut hazy = LinearImage::filled(4, 4, [0.5, 0.5, 0.5]);
        let add = EffectsParams {
            dehaze: -1.0,
            ..EffectsParams::identity()
        };
        apply_effects(&mut hazy, &add);
        // Adding haze pulls values toward the airlight.
        assert!(hazy.pixel(0, 0)[0] > 0.5);
    }

    #[test]
    fn dehaze_preserves_airlight_level() {
        // A pixel at the airlight level is pure haze; the model maps it
        // to itself for any slider position.
        let mut img = LinearImage::filled(2, 2, [DEHAZE_AIRLIGHT; 3]);
        apply_dehaze(&mut img, 0.8);
        assert!((img.pixel(0, 0)[0] - DEHAZE_AIRLIGHT).abs() < 1e-5);
    }

    #[test]
    fn vignette_darkens_corners_only() {
        let mut img = LinearImage::filled(33, 33, [0.5, 0.5, 0.5]);
        let fx = EffectsParams {
            vignette_amount: -0.8,
            ..EffectsParams::identity()
        };
        apply_effects(&mut img, &fx);
        // Center untouched (inside the 60% onset radius).
        assert_eq!(img.pixel(16, 16), [0.5, 0.5, 0.5]);
        // Corner darkened.
        assert!(img.pixel(0, 0)[0] < 0.5);
        // Symmetric.
        assert_eq!(img.pixel(0, 0), img.pixel(32, 32));
    }

    #[test]
    fn vignette_positive_brightens() {
        let mut img = LinearImage::filled(33, 33, [0.5, 0.5, 0.5]);
        apply_vignette(&mut img, 0.8);
        assert!(img.pixel(0, 0)[0] > 0.5);
    }

    #[test]
    fn grain_is_deterministic_per_seed() {
        let base = LinearImage::filled(16, 16, [0.5, 0.5, 0.5]);
        let fx = EffectsParams {
            grain_amount: 0.5,
            grain_seed: 7,
            ..EffectsParams::identity()
        };

        let mut a = base.clone();
        let mut b = base.clone();
        apply_effects(&mut a, &fx);
        apply_effects(&mut b, &fx);
        assert_eq!(a, b);

        let mut c = base.clone();
        let other = EffectsParams {
            grain_seed: 8,
            ..fx
        };
        apply_effects(&mut c, &other);
        assert_ne!(a, c);
    }

    #[test]
    fn grain_channels_decorrelated() {
        let mut img = LinearImage::filled(32, 32, [0.5, 0.5, 0.5]);
        apply_grain(&mut img, 1.0, 3);
        let differs = (0..32)
            .flat_map(|y| (0..32).map(move |x| (x, y)))
            .any(|(x, y)| {
                let px = img.pixel(x, y);
                (px[0] - px[1]).abs() > 1e-4
            });
        assert!(differs, "channels should carry independent noise");
    }

    #[test]
    fn grain_weight_parabolic() {
        assert!(grain_weight(0.5) < grain_weight(0.0));
        assert!(grain_weight(0.5) < grain_weight(1.0));
        assert!((grain_weight(0.0) - grain_weight(1.0)).abs() < 1e-6);
    }

    #[test]
    fn hash_noise_in_range_and_varies() {
        let mut sum = 0.0f64;
        for i in 0..1000u32 {
            let n = hash_noise(i % 40, i / 40, 11);
            assert!((-1.0..=1.0).contains(&n));
            sum += n as f64;
        }
        // Roughly zero-mean.
        assert!((sum / 1000.0).abs() < 0.1, "mean={}", sum / 1000.0);
    }
}
