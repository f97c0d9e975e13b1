//! Per-stage parameter digests and chained output identities.
//!
//! Cache keys must treat `0.30001` and `0.3000099` as the same slider
//! position: floats are rounded to four decimal digits before hashing, so
//! sub-precision noise from UI round-trips never causes a spurious miss.
//! The digest is 128 bits (SipHash-1-3), wide enough that key collisions
//! are negligible without storing the raw values for verification.

use std::hash::Hasher;

use siphasher::sip128::{Hasher128, SipHasher13};

use crate::params::{AdjustmentParameters, ColorGrading, GradeWheel, HslBand, ToneCurve};
use crate::stage::{ParameterField, ProcessingStage};

// Fixed keys: digests must be stable across processes so a persisted
// session can revalidate its cache bookkeeping.
const HASH_KEY_0: u64 = 0x7265_7665_6c61_2d70;
const HASH_KEY_1: u64 = 0x6172_616d_6873_6821;

/// Scale used when rounding floats for hashing: four decimal digits.
const ROUND_SCALE: f64 = 1e4;

/// A 128-bit digest of one stage's relevant parameter subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterHash(pub u128);

impl std::fmt::Display for ParameterHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Identity of an image flowing between stages.
///
/// A source image gets a fresh id on load; each stage's output identity
/// chains the stage, its parameter hash, and its input's identity. Two
/// equal ids therefore mean "same source, same upstream parameters" —
/// exactly the validity condition the stage cache needs, checked in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u128);

impl OutputId {
    /// Identity for a freshly loaded source image.
    pub fn source(generation: u64) -> Self {
        let mut h = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
        h.write_u8(0xC5); // source tag
        h.write_u64(generation);
        Self(h.finish128().as_u128())
    }

    /// Identity of a stage's output given its inputs.
    pub fn for_stage(stage: ProcessingStage, params: ParameterHash, upstream: OutputId) -> Self {
        let mut h = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
        h.write_u8(0x5A); // stage-output tag
        h.write_u8(stage.order() as u8);
        h.write_u128(params.0);
        h.write_u128(upstream.0);
        Self(h.finish128().as_u128())
    }

    /// A tagged identity derived from this one.
    ///
    /// Used for deterministic images computed from an identified input
    /// outside the stage chain, e.g. the downscaled preview base at a
    /// given resolution-ladder level.
    pub fn derive(self, tag: u64) -> Self {
        let mut h = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
        h.write_u8(0xD7); // derived tag
        h.write_u128(self.0);
        h.write_u64(tag);
        Self(h.finish128().as_u128())
    }
}

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Computes the digest of `stage`'s relevant fields in `params`.
///
/// Guarantees:
/// - deterministic: equal relevant subsets always produce equal hashes
/// - sensitive: a change ≥ 1e-4 in any relevant field changes the hash
///   (up to 128-bit collision probability)
/// - insensitive: irrelevant fields and sub-1e-4 noise never change it
pub fn stage_hash(params: &AdjustmentParameters, stage: ProcessingStage) -> ParameterHash {
    let mut h = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
    h.write_u8(stage.order() as u8);
    for &field in stage.fields() {
        h.write_u8(field as u8);
        write_field(&mut h, params, field);
    }
    ParameterHash(h.finish128().as_u128())
}

#[inline]
fn round4(v: f32) -> i64 {
    (v as f64 * ROUND_SCALE).round() as i64
}

fn write_f32(h: &mut SipHasher13, v: f32) {
    h.write_i64(round4(v));
}

fn write_curve(h: &mut SipHasher13, curve: &ToneCurve) {
    h.write_usize(curve.points.len());
    for p in &curve.points {
        write_f32(h, p.x);
        write_f32(h, p.y);
    }
}

fn write_band(h: &mut SipHasher13, band: &HslBand) {
    write_f32(h, band.hue);
    write_f32(h, band.saturation);
    write_f32(h, band.luminance);
}

fn write_wheel(h: &mut SipHasher13, wheel: &GradeWheel) {
    write_f32(h, wheel.hue);
    write_f32(h, wheel.saturation);
    write_f32(h, wheel.luminance);
}

fn write_grading(h: &mut SipHasher13, grading: &ColorGrading) {
    write_wheel(h, &grading.shadows);
    write_wheel(h, &grading.midtones);
    write_wheel(h, &grading.highlights);
    write_f32(h, grading.blending);
}

fn write_field(h: &mut SipHasher13, params: &AdjustmentParameters, field: ParameterField) {
    use ParameterField as F;
    match field {
        F::Orientation => h.write_u8(params.orientation as u8),
        F::Exposure => write_f32(h, params.exposure),
        F::Contrast => write_f32(h, params.contrast),
        F::Highlights => write_f32(h, params.highlights),
        F::Shadows => write_f32(h, params.shadows),
        F::Whites => write_f32(h, params.whites),
        F::Blacks => write_f32(h, params.blacks),
        F::CurvesEnabled => h.write_u8(params.curves.enabled as u8),
        F::LumaCurve => write_curve(h, &params.curves.luma),
        F::RedCurve => write_curve(h, &params.curves.red),
        F::GreenCurve => write_curve(h, &params.curves.green),
        F::BlueCurve => write_curve(h, &params.curves.blue),
        F::Temperature => write_f32(h, params.temperature),
        F::Tint => write_f32(h, params.tint),
        F::Saturation => write_f32(h, params.saturation),
        F::Vibrance => write_f32(h, params.vibrance),
        F::Hsl => {
            for band in &params.hsl {
                write_band(h, band);
            }
        }
        F::Grading => write_grading(h, &params.grading),
        F::Clarity => write_f32(h, params.clarity),
        F::Texture => write_f32(h, params.texture),
        F::Dehaze => write_f32(h, params.dehaze),
        F::VignetteAmount => write_f32(h, params.vignette_amount),
        F::GrainAmount => write_f32(h, params.grain_amount),
        F::GrainSeed => h.write_u32(params.grain_seed),
        F::Sharpening => write_f32(h, params.sharpening),
        F::SharpenRadius => write_f32(h, params.sharpen_radius),
        F::NoiseReduction => write_f32(h, params.noise_reduction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CurvePoint;

    #[test]
    fn test_deterministic() {
        let params = AdjustmentParameters::default();
        for stage in ProcessingStage::ALL {
            assert_eq!(stage_hash(&params, stage), stage_hash(&params, stage));
        }
    }

    #[test]
    fn test_sensitive_to_relevant_field() {
        let old = AdjustmentParameters::default();
        let mut new = old.clone();
        new.exposure = 0.5;
        assert_ne!(
            stage_hash(&old, ProcessingStage::ToneBase),
            stage_hash(&new, ProcessingStage::ToneBase)
        );
    }

    #[test]
    fn test_insensitive_to_irrelevant_field() {
        let old = AdjustmentParameters::default();
        let mut new = old.clone();
        new.sharpening = 0.9; // Details field
        assert_eq!(
            stage_hash(&old, ProcessingStage::ToneBase),
            stage_hash(&new, ProcessingStage::ToneBase)
        );
        assert_eq!(
            stage_hash(&old, ProcessingStage::Color),
            stage_hash(&new, ProcessingStage::Color)
        );
        assert_ne!(
            stage_hash(&old, ProcessingStage::Details),
            stage_hash(&new, ProcessingStage::Details)
        );
    }

    #[test]
    fn test_insensitive_to_subprecision_noise() {
        let old = AdjustmentParameters::default();
        let mut new = old.clone();
        new.exposure = 0.000_04; // rounds to 0.0000 at 4 decimals
        assert_eq!(
            stage_hash(&old, ProcessingStage::ToneBase),
            stage_hash(&new, ProcessingStage::ToneBase)
        );

        let mut base = old.clone();
        base.contrast = 0.3;
        let mut noisy = base.clone();
        noisy.contrast = 0.300_04;
        assert_eq!(
            stage_hash(&base, ProcessingStage::ToneBase),
            stage_hash(&noisy, ProcessingStage::ToneBase)
        );
    }

    #[test]
    fn test_curve_points_affect_hash() {
        let old = AdjustmentParameters::default();
        let mut new = old.clone();
        new.curves.red = ToneCurve::new(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(0.5, 0.6),
            CurvePoint::new(1.0, 1.0),
        ]);
        assert_ne!(
            stage_hash(&old, ProcessingStage::Curves),
            stage_hash(&new, ProcessingStage::Curves)
        );
    }

    #[test]
    fn test_derived_ids_distinct() {
        let src = OutputId::source(1);
        assert_ne!(src.derive(0), src.derive(1));
        assert_ne!(src.derive(0), src);
        assert_eq!(src.derive(2), src.derive(2));
        assert_ne!(src.derive(0), OutputId::source(2).derive(0));
    }

    #[test]
    fn test_output_id_chains() {
        let params = AdjustmentParameters::default();
        let src_a = OutputId::source(1);
        let src_b = OutputId::source(2);
        assert_ne!(src_a, src_b);

        let tone = stage_hash(&params, ProcessingStage::ToneBase);
        let out_a = OutputId::for_stage(ProcessingStage::ToneBase, tone, src_a);
        let out_b = OutputId::for_stage(ProcessingStage::ToneBase, tone, src_b);
        // Same parameters over a different source: different identity.
        assert_ne!(out_a, out_b);
        // Fully identical inputs: identical identity.
        assert_eq!(
            out_a,
            OutputId::for_stage(ProcessingStage::ToneBase, tone, src_a)
        );
    }
}
