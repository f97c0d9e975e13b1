//! Parameter change detection.
//!
//! The diff compares two snapshots field by field and resolves the result
//! to the pipeline's unit of work: the contiguous suffix of stages
//! starting at the earliest affected one. Downstream stages always
//! re-run, whether or not their own fields changed — their input image
//! changed.

use std::collections::BTreeSet;

use crate::params::AdjustmentParameters;
use crate::stage::{ParameterField, ProcessingStage};

/// The result of diffing two parameter snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDelta {
    /// Every field whose value differs.
    pub changed_fields: BTreeSet<ParameterField>,
    /// Stages owning at least one changed field.
    pub affected_stages: BTreeSet<ProcessingStage>,
    /// The earliest affected stage; `None` when nothing changed.
    pub start_stage: Option<ProcessingStage>,
    /// The contiguous suffix of stages to re-run, in order.
    pub stages_to_recompute: Vec<ProcessingStage>,
}

impl ParameterDelta {
    /// A delta representing "nothing changed".
    pub fn empty() -> Self {
        Self {
            changed_fields: BTreeSet::new(),
            affected_stages: BTreeSet::new(),
            start_stage: None,
            stages_to_recompute: Vec::new(),
        }
    }

    /// True when no stage needs to re-run.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start_stage.is_none()
    }
}

/// Diffs `old` against `new`.
///
/// - `old == Some(new)` (full structural equality): empty delta.
/// - `old == None`: a cold render — every field counts as changed and
///   all stages re-run from [`ProcessingStage::ToneBase`].
/// - Otherwise: per-field comparison, then the contiguous-suffix rule.
pub fn detect_changes(
    old: Option<&AdjustmentParameters>,
    new: &AdjustmentParameters,
) -> ParameterDelta {
    let changed_fields: BTreeSet<ParameterField> = match old {
        None => ParameterField::ALL.into_iter().collect(),
        Some(old) if old == new => BTreeSet::new(),
        Some(old) => ParameterField::ALL
            .into_iter()
            .filter(|&f| field_changed(old, new, f))
            .collect(),
    };

    if changed_fields.is_empty() {
        return ParameterDelta::empty();
    }

    let affected_stages: BTreeSet<ProcessingStage> =
        changed_fields.iter().map(|f| f.stage()).collect();
    // BTreeSet iterates in stage order, so the first element is earliest.
    let start = *affected_stages.iter().next().unwrap_or(&ProcessingStage::ToneBase);

    ParameterDelta {
        changed_fields,
        affected_stages,
        start_stage: Some(start),
        stages_to_recompute: start.suffix().to_vec(),
    }
}

/// Structural comparison of one field across two snapshots.
fn field_changed(old: &AdjustmentParameters, new: &AdjustmentParameters, f: ParameterField) -> bool {
    use ParameterField as F;
    match f {
        F::Orientation => old.orientation != new.orientation,
        F::Exposure => old.exposure != new.exposure,
        F::Contrast => old.contrast != new.contrast,
        F::Highlights => old.highlights != new.highlights,
        F::Shadows => old.shadows != new.shadows,
        F::Whites => old.whites != new.whites,
        F::Blacks => old.blacks != new.blacks,
        F::CurvesEnabled => old.curves.enabled != new.curves.enabled,
        F::LumaCurve => old.curves.luma != new.curves.luma,
        F::RedCurve => old.curves.red != new.curves.red,
        F::GreenCurve => old.curves.green != new.curves.green,
        F::BlueCurve => old.curves.blue != new.curves.blue,
        F::Temperature => old.temperature != new.temperature,
        F::Tint => old.tint != new.tint,
        F::Saturation => old.saturation != new.saturation,
        F::Vibrance => old.vibrance != new.vibrance,
        F::Hsl => old.hsl != new.hsl,
        F::Grading => old.grading != new.grading,
        F::Clarity => old.clarity != new.clarity,
        F::Texture => old.texture != new.texture,
        F::Dehaze => old.dehaze != new.dehaze,
        F::VignetteAmount => old.vignette_amount != new.vignette_amount,
        F::GrainAmount => old.grain_amount != new.grain_amount,
        F::GrainSeed => old.grain_seed != new.grain_seed,
        F::Sharpening => old.sharpening != new.sharpening,
        F::SharpenRadius => old.sharpen_radius != new.sharpen_radius,
        F::NoiseReduction => old.noise_reduction != new.noise_reduction,
    }
}
