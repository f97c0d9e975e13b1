//! Base tone kernel: exposure, pivoted contrast, and the four tonal
//! region sliders.
//!
//! Exposure and the region sliders are multiplicative gains in linear
//! light (a slider at +1 adds up to its full range in stops, weighted by
//! how strongly the pixel's luminance sits in the region). Contrast is a
//! power curve pivoted at mid-gray so that 18% reflectance stays put.

use revela_core::{LinearImage, luminance};
use revela_params::AdjustmentParameters;

use crate::parallel::par_map_pixels;
use crate::util::smoothstep;

/// Contrast pivot: scene mid-gray.
pub const PIVOT: f32 = 0.18;

/// Lower bound on the contrast exponent.
pub const MIN_CONTRAST: f32 = 0.001;

/// Full-range strength of the highlights/shadows sliders, in stops.
const REGION_RANGE_WIDE: f32 = 1.0;

/// Full-range strength of the whites/blacks sliders, in stops.
const REGION_RANGE_NARROW: f32 = 0.5;

/// Parameters for the base tone transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    /// Exposure in stops.
    pub exposure: f32,
    /// Contrast slider in `[-1, 1]`; 0 is identity.
    pub contrast: f32,
    /// Highlight region slider.
    pub highlights: f32,
    /// Shadow region slider.
    pub shadows: f32,
    /// White point slider.
    pub whites: f32,
    /// Black point slider.
    pub blacks: f32,
}

impl ToneParams {
    /// Extracts the tone subset from a full snapshot.
    pub fn from_snapshot(p: &AdjustmentParameters) -> Self {
        Self {
            exposure: p.exposure,
            contrast: p.contrast,
            highlights: p.highlights,
            shadows: p.shadows,
            whites: p.whites,
            blacks: p.blacks,
        }
    }

    /// Identity (no change).
    pub fn identity() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
        }
    }

    /// Check if this is identity (no-op).
    pub fn is_identity(&self) -> bool {
        self.exposure == 0.0
            && self.contrast == 0.0
            && self.highlights == 0.0
            && self.shadows == 0.0
            && self.whites == 0.0
            && self.blacks == 0.0
    }

    /// Apply the transform to one RGB pixel.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = rgb;

        let exposure_gain = 2.0_f32.powf(self.exposure);
        if exposure_gain != 1.0 {
            for c in &mut out {
                *c *= exposure_gain;
            }
        }

        let region_stops = self.region_stops(luminance(out));
        if region_stops != 0.0 {
            let gain = 2.0_f32.powf(region_stops);
            for c in &mut out {
                *c *= gain;
            }
        }

        if self.contrast != 0.0 {
            let exponent = (1.0 + self.contrast).max(MIN_CONTRAST);
            for c in &mut out {
                *c = (*c / PIVOT).max(0.0).powf(exponent) * PIVOT;
            }
        }

        out
    }

    /// Combined region gain in stops at the given luminance.
    ///
    /// Shadows cover the lower half, highlights the upper; blacks and
    /// whites concentrate at the extremes with half the range. The
    /// weights overlap smoothly, so neighbouring sliders blend rather
    /// than seam.
    #[inline]
    fn region_stops(&self, luma: f32) -> f32 {
        let w_shadows = 1.0 - smoothstep(0.0, 0.5, luma);
        let w_highlights = smoothstep(0.5, 1.0, luma);
        let w_blacks = 1.0 - smoothstep(0.0, 0.25, luma);
        let w_whites = smoothstep(0.75, 1.25, luma);

        (self.shadows * w_shadows + self.highlights * w_highlights) * REGION_RANGE_WIDE
            + (self.blacks * w_blacks + self.whites * w_whites) * REGION_RANGE_NARROW
    }
}

/// Applies the base tone transform to an image in place.
pub fn apply_tone(img: &mut LinearImage, tone: &ToneParams) {
    if tone.is_identity() {
        return;
    }
    let t = *tone;
    par_map_pixels(img, move |rgb| t.apply(rgb));
}
