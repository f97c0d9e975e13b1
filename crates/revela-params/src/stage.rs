//! Pipeline stages and the static field→stage ownership table.
//!
//! The five stages form a total order; an edit to any field re-runs the
//! contiguous suffix starting at the owning stage. Every
//! [`AdjustmentParameters`](crate::AdjustmentParameters) field appears in
//! exactly one stage's list — the exhaustive `match` in
//! [`ParameterField::stage`] is the single source of truth.

use serde::{Deserialize, Serialize};

/// One ordered phase of the adjustment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessingStage {
    /// Orientation plus global and region tone: exposure, contrast,
    /// highlights/shadows/whites/blacks.
    ToneBase,
    /// Per-channel tone curves.
    Curves,
    /// White balance, saturation/vibrance, HSL mixer, grading wheels.
    Color,
    /// Clarity/texture/dehaze, vignette, grain.
    Effects,
    /// Sharpening and noise reduction.
    Details,
}

impl ProcessingStage {
    /// All stages in execution order.
    pub const ALL: [ProcessingStage; 5] = [
        ProcessingStage::ToneBase,
        ProcessingStage::Curves,
        ProcessingStage::Color,
        ProcessingStage::Effects,
        ProcessingStage::Details,
    ];

    /// Position in the total order, 0-based.
    #[inline]
    pub fn order(self) -> usize {
        self as usize
    }

    /// The stage immediately before this one, if any.
    #[inline]
    pub fn predecessor(self) -> Option<ProcessingStage> {
        match self.order() {
            0 => None,
            n => Some(Self::ALL[n - 1]),
        }
    }

    /// The contiguous suffix of the stage order starting here.
    #[inline]
    pub fn suffix(self) -> &'static [ProcessingStage] {
        &Self::ALL[self.order()..]
    }

    /// Whether this stage's output is worth keeping in the stage cache.
    ///
    /// The final stage is excluded: its output immediately becomes the
    /// encoded preview, which the L1 cache holds instead.
    #[inline]
    pub fn should_cache(self) -> bool {
        !matches!(self, ProcessingStage::Details)
    }

    /// Rough per-stage cost in milliseconds, for progress/ETA display.
    #[inline]
    pub fn estimated_ms(self) -> u32 {
        match self {
            ProcessingStage::ToneBase => 12,
            ProcessingStage::Curves => 8,
            ProcessingStage::Color => 15,
            ProcessingStage::Effects => 25,
            ProcessingStage::Details => 20,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            ProcessingStage::ToneBase => "tone-base",
            ProcessingStage::Curves => "curves",
            ProcessingStage::Color => "color",
            ProcessingStage::Effects => "effects",
            ProcessingStage::Details => "details",
        }
    }

    /// The parameter fields this stage reads.
    pub fn fields(self) -> &'static [ParameterField] {
        use ParameterField as F;
        match self {
            ProcessingStage::ToneBase => &[
                F::Orientation,
                F::Exposure,
                F::Contrast,
                F::Highlights,
                F::Shadows,
                F::Whites,
                F::Blacks,
            ],
            ProcessingStage::Curves => &[
                F::CurvesEnabled,
                F::LumaCurve,
                F::RedCurve,
                F::GreenCurve,
                F::BlueCurve,
            ],
            ProcessingStage::Color => &[
                F::Temperature,
                F::Tint,
                F::Saturation,
                F::Vibrance,
                F::Hsl,
                F::Grading,
            ],
            ProcessingStage::Effects => &[
                F::Clarity,
                F::Texture,
                F::Dehaze,
                F::VignetteAmount,
                F::GrainAmount,
                F::GrainSeed,
            ],
            ProcessingStage::Details => &[F::Sharpening, F::SharpenRadius, F::NoiseReduction],
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every field of the adjustment snapshot, as a comparable unit.
///
/// Compound values (a whole curve, the HSL band array, the grading
/// wheels) diff and hash as single fields: the pipeline only needs to
/// know *which stage* is affected, not which control point moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ParameterField {
    Orientation,
    Exposure,
    Contrast,
    Highlights,
    Shadows,
    Whites,
    Blacks,
    CurvesEnabled,
    LumaCurve,
    RedCurve,
    GreenCurve,
    BlueCurve,
    Temperature,
    Tint,
    Saturation,
    Vibrance,
    Hsl,
    Grading,
    Clarity,
    Texture,
    Dehaze,
    VignetteAmount,
    GrainAmount,
    GrainSeed,
    Sharpening,
    SharpenRadius,
    NoiseReduction,
}

impl ParameterField {
    /// Every field, in stage order.
    pub const ALL: [ParameterField; 27] = [
        ParameterField::Orientation,
        ParameterField::Exposure,
        ParameterField::Contrast,
        ParameterField::Highlights,
        ParameterField::Shadows,
        ParameterField::Whites,
        ParameterField::Blacks,
        ParameterField::CurvesEnabled,
        ParameterField::LumaCurve,
        ParameterField::RedCurve,
        ParameterField::GreenCurve,
        ParameterField::BlueCurve,
        ParameterField::Temperature,
        ParameterField::Tint,
        ParameterField::Saturation,
        ParameterField::Vibrance,
        ParameterField::Hsl,
        ParameterField::Grading,
        ParameterField::Clarity,
        ParameterField::Texture,
        ParameterField::Dehaze,
        ParameterField::VignetteAmount,
        ParameterField::GrainAmount,
        ParameterField::GrainSeed,
        ParameterField::Sharpening,
        ParameterField::SharpenRadius,
        ParameterField::NoiseReduction,
    ];

    /// The stage that owns this field.
    pub fn stage(self) -> ProcessingStage {
        use ParameterField as F;
        match self {
            F::Orientation | F::Exposure | F::Contrast | F::Highlights | F::Shadows
            | F::Whites | F::Blacks => ProcessingStage::ToneBase,
            F::CurvesEnabled | F::LumaCurve | F::RedCurve | F::GreenCurve | F::BlueCurve => {
                ProcessingStage::Curves
            }
            F::Temperature | F::Tint | F::Saturation | F::Vibrance | F::Hsl | F::Grading => {
                ProcessingStage::Color
            }
            F::Clarity | F::Texture | F::Dehaze | F::VignetteAmount | F::GrainAmount
            | F::GrainSeed => ProcessingStage::Effects,
            F::Sharpening | F::SharpenRadius | F::NoiseReduction => ProcessingStage::Details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        let orders: Vec<usize> = ProcessingStage::ALL.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4]);
        assert!(ProcessingStage::ToneBase < ProcessingStage::Details);
    }

    #[test]
    fn test_suffix_is_contiguous() {
        assert_eq!(
            ProcessingStage::Color.suffix(),
            &[
                ProcessingStage::Color,
                ProcessingStage::Effects,
                ProcessingStage::Details
            ]
        );
        assert_eq!(ProcessingStage::ToneBase.suffix(), &ProcessingStage::ALL);
        assert_eq!(ProcessingStage::Details.suffix(), &[ProcessingStage::Details]);
    }

    #[test]
    fn test_predecessor() {
        assert_eq!(ProcessingStage::ToneBase.predecessor(), None);
        assert_eq!(
            ProcessingStage::Details.predecessor(),
            Some(ProcessingStage::Effects)
        );
    }

    #[test]
    fn test_mapping_is_exhaustive_and_exclusive() {
        // Every field appears in exactly one stage's field list, and that
        // list agrees with the field's own stage().
        for field in ParameterField::ALL {
            let owners: Vec<ProcessingStage> = ProcessingStage::ALL
                .into_iter()
                .filter(|s| s.fields().contains(&field))
                .collect();
            assert_eq!(owners.len(), 1, "{field:?} owned by {owners:?}");
            assert_eq!(owners[0], field.stage());
        }

        let total: usize = ProcessingStage::ALL.iter().map(|s| s.fields().len()).sum();
        assert_eq!(total, ParameterField::ALL.len());
    }

    #[test]
    fn test_details_not_cached() {
        assert!(ProcessingStage::ToneBase.should_cache());
        assert!(ProcessingStage::Effects.should_cache());
        assert!(!ProcessingStage::Details.should_cache());
    }
}
