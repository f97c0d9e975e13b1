//! Color stage kernel: white balance, saturation and vibrance, the
//! 8-band HSL mixer, and three-way color grading.
//!
//! Saturation-style operations mix each channel toward Rec.709 luminance;
//! the HSL mixer works in hue/saturation/lightness space with smooth band
//! weighting so adjacent bands blend instead of seaming.

use revela_core::{LinearImage, luminance};
use revela_params::{AdjustmentParameters, ColorGrading, GradeWheel, HSL_BAND_COUNT, HslBand};

use crate::parallel::par_map_pixels;
use crate::util::smoothstep;

/// Width of one HSL mixer band in degrees.
const BAND_WIDTH: f32 = 360.0 / HSL_BAND_COUNT as f32;

/// Strongest white-balance channel swing, in stops.
const WB_RANGE: f32 = 0.4;

/// Parameters for the color transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorParams {
    /// Warm/cool white balance in `[-1, 1]`.
    pub temperature: f32,
    /// Green/magenta white balance in `[-1, 1]`.
    pub tint: f32,
    /// Uniform saturation in `[-1, 1]`.
    pub saturation: f32,
    /// Muted-color-weighted saturation in `[-1, 1]`.
    pub vibrance: f32,
    /// The 8-band mixer.
    pub hsl: [HslBand; HSL_BAND_COUNT],
    /// The grading wheels.
    pub grading: ColorGrading,
}

impl ColorParams {
    /// Extracts the color subset from a full snapshot.
    pub fn from_snapshot(p: &AdjustmentParameters) -> Self {
        Self {
            temperature: p.temperature,
            tint: p.tint,
            saturation: p.saturation,
            vibrance: p.vibrance,
            hsl: p.hsl,
            grading: p.grading,
        }
    }

    /// Identity (no change).
    pub fn identity() -> Self {
        Self {
            temperature: 0.0,
            tint: 0.0,
            saturation: 0.0,
            vibrance: 0.0,
            hsl: [HslBand::default(); HSL_BAND_COUNT],
            grading: ColorGrading::default(),
        }
    }

    /// Check if this is identity (no-op).
    pub fn is_identity(&self) -> bool {
        self.temperature == 0.0
            && self.tint == 0.0
            && self.saturation == 0.0
            && self.vibrance == 0.0
            && self.hsl.iter().all(|b| b.is_identity())
            && self.grading.is_identity()
    }

    /// Apply the transform to one RGB pixel.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = rgb;

        if self.temperature != 0.0 || self.tint != 0.0 {
            out = white_balance(out, self.temperature, self.tint);
        }
        if self.saturation != 0.0 {
            out = saturate(out, 1.0 + self.saturation);
        }
        if self.vibrance != 0.0 {
            out = vibrance(out, self.vibrance);
        }
        if self.hsl.iter().any(|b| !b.is_identity()) {
            out = hsl_mixer(out, &self.hsl);
        }
        if !self.grading.is_identity() {
            out = grade(out, &self.grading);
        }
        out
    }
}

/// Applies the color transform to an image in place.
pub fn apply_color(img: &mut LinearImage, color: &ColorParams) {
    if color.is_identity() {
        return;
    }
    let c = color.clone();
    par_map_pixels(img, move |rgb| c.apply(rgb));
}

/// Channel gains for temperature/tint.
///
/// Warm raises red and lowers blue; tint trades green against magenta.
/// Gains are symmetric in stops so opposite slider values cancel.
#[inline]
fn white_balance(rgb: [f32; 3], temperature: f32, tint: f32) -> [f32; 3] {
    let r_gain = 2.0_f32.powf(temperature * WB_RANGE);
    let b_gain = 2.0_f32.powf(-temperature * WB_RANGE);
    let g_gain = 2.0_f32.powf(-tint * WB_RANGE);
    [rgb[0] * r_gain, rgb[1] * g_gain, rgb[2] * b_gain]
}

/// Scales chroma about luminance.
#[inline]
fn saturate(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    let luma = luminance(rgb);
    [
        (luma + factor * (rgb[0] - luma)).max(0.0),
        (luma + factor * (rgb[1] - luma)).max(0.0),
        (luma + factor * (rgb[2] - luma)).max(0.0),
    ]
}

/// Saturation weighted toward muted colors.
///
/// Already-vivid pixels get a reduced boost so skin and sky do not blow
/// out before dull regions catch up.
#[inline]
fn vibrance(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    let chroma = if max > 1e-6 { (max - min) / max } else { 0.0 };
    let weight = 1.0 - chroma.clamp(0.0, 1.0);
    saturate(rgb, 1.0 + amount * weight)
}

/// The 8-band mixer: hue shift, saturation offset, lightness offset per
/// band, with triangular weights across neighbouring band centers.
fn hsl_mixer(rgb: [f32; 3], bands: &[HslBand; HSL_BAND_COUNT]) -> [f32; 3] {
    let (h, s, l) = rgb_to_hsl(rgb);
    if s < 1e-5 {
        // Neutral pixels have no meaningful hue; leave them alone.
        return rgb;
    }

    let mut hue_shift = 0.0f32;
    let mut sat_offset = 0.0f32;
    let mut lum_offset = 0.0f32;
    for (i, band) in bands.iter().enumerate() {
        let center = i as f32 * BAND_WIDTH;
        let w = band_weight(h, center);
        if w == 0.0 {
            continue;
        }
        hue_shift += band.hue * BAND_WIDTH * w;
        sat_offset += band.saturation * w;
        lum_offset += band.luminance * w;
    }

    let new_h = (h + hue_shift).rem_euclid(360.0);
    let new_s = (s * (1.0 + sat_offset)).clamp(0.0, 1.0);
    let new_l = (l * (1.0 + lum_offset * 0.5)).max(0.0);
    hsl_to_rgb(new_h, new_s, new_l)
}

/// Triangular weight of a hue against a band center, wrapping at 360°.
#[inline]
fn band_weight(hue: f32, center: f32) -> f32 {
    let mut d = (hue - center).abs();
    if d > 180.0 {
        d = 360.0 - d;
    }
    (1.0 - d / BAND_WIDTH).max(0.0)
}

/// Three-way grading: each wheel tints and trims its tonal zone.
fn grade(rgb: [f32; 3], grading: &ColorGrading) -> [f32; 3] {
    let luma = luminance(rgb).clamp(0.0, 1.0);
    // Blending widens the zone crossovers. At 0 the zones hand over
    // sharply around the terciles; at 1 they overlap broadly.
    let soft = 0.1 + grading.blending * 0.4;

    let w_shadows = 1.0 - smoothstep(0.33 - soft, 0.33 + soft, luma);
    let w_highlights = smoothstep(0.66 - soft, 0.66 + soft, luma);
    let w_midtones = (1.0 - w_shadows - w_highlights).max(0.0);

    let mut out = rgb;
    for (wheel, weight) in [
        (&grading.shadows, w_shadows),
        (&grading.midtones, w_midtones),
        (&grading.highlights, w_highlights),
    ] {
        if weight > 0.0 && !wheel.is_identity() {
            out = apply_wheel(out, wheel, weight);
        }
    }
    out
}

/// One wheel: push toward the tint hue and scale by the luminance trim.
#[inline]
fn apply_wheel(rgb: [f32; 3], wheel: &GradeWheel, weight: f32) -> [f32; 3] {
    let strength = wheel.saturation * weight;
    let tint = hue_direction(wheel.hue);
    let lum_gain = 2.0_f32.powf(wheel.luminance * weight * 0.5);

    let luma = luminance(rgb).max(0.0);
    [
        ((rgb[0] + tint[0] * strength * luma.max(0.05)) * lum_gain).max(0.0),
        ((rgb[1] + tint[1] * strength * luma.max(0.05)) * lum_gain).max(0.0),
        ((rgb[2] + tint[2] * strength * luma.max(0.05)) * lum_gain).max(0.0),
    ]
}

/// Unit-chroma RGB direction for a hue angle, zero-sum so the push never
/// changes luminance-neutral gray into a brighter pixel overall.
#[inline]
fn hue_direction(hue_deg: f32) -> [f32; 3] {
    let rgb = hsl_to_rgb(hue_deg.rem_euclid(360.0), 1.0, 0.5);
    let mean = (rgb[0] + rgb[1] + rgb[2]) / 3.0;
    [rgb[0] - mean, rgb[1] - mean, rgb[2] - mean]
}

/// RGB → HSL. Hue in degrees `[0, 360)`, saturation and lightness in
/// `[0, 1]` (lightness may exceed 1 for overbright input).
pub fn rgb_to_hsl(rgb: [f32; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) * 0.5;
    let delta = max - min;

    if delta < 1e-6 {
        return (0.0, 0.0, l);
    }

    let s = if l < 0.5 {
        delta / (max + min).max(1e-6)
    } else {
        delta / (2.0 - max - min).max(1e-6)
    };

    let h = if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (h.rem_euclid(360.0), s.clamp(0.0, 1.0), l)
}

/// HSL → RGB, inverse of [`rgb_to_hsl`] for in-gamut values.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s < 1e-6 {
        return [l, l, l];
    }
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c * 0.5;
    [r1 + m, g1 + m, b1 + m]
}
