//! The adjustment parameter snapshot and its subtypes.
//!
//! A snapshot is a plain value: `Clone` copies it, `PartialEq` compares
//! every field including curve point vectors and band arrays. The pipeline
//! relies on that exact equality to detect "no change" precisely, so none
//! of these types carry interior mutability or identity.

use serde::{Deserialize, Serialize};

/// Number of hue bands in the HSL mixer.
pub const HSL_BAND_COUNT: usize = 8;

/// A single control point on a tone curve. Coordinates are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Input value.
    pub x: f32,
    /// Output value.
    pub y: f32,
}

impl CurvePoint {
    /// Create a new control point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An ordered list of control points defining one tone curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurve {
    /// Control points, ordered by ascending `x`.
    pub points: Vec<CurvePoint>,
}

impl ToneCurve {
    /// Create a curve from control points.
    ///
    /// Points are sorted by `x` so callers cannot hand the evaluator an
    /// out-of-order list.
    pub fn new(mut points: Vec<CurvePoint>) -> Self {
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { points }
    }

    /// The identity curve `y = x`.
    pub fn identity() -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
        }
    }

    /// True when every point lies on the `y = x` diagonal.
    pub fn is_identity(&self) -> bool {
        self.points.iter().all(|p| (p.x - p.y).abs() < 1e-6)
    }
}

impl Default for ToneCurve {
    fn default() -> Self {
        Self::identity()
    }
}

/// The per-channel tone curve set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurveSet {
    /// Master enable; disabled curves are a normal skip, not an error.
    pub enabled: bool,
    /// Composite curve applied to all three channels.
    pub luma: ToneCurve,
    /// Red channel curve.
    pub red: ToneCurve,
    /// Green channel curve.
    pub green: ToneCurve,
    /// Blue channel curve.
    pub blue: ToneCurve,
}

impl ToneCurveSet {
    /// True when curves are disabled or every curve is identity.
    pub fn is_identity(&self) -> bool {
        !self.enabled
            || (self.luma.is_identity()
                && self.red.is_identity()
                && self.green.is_identity()
                && self.blue.is_identity())
    }
}

impl Default for ToneCurveSet {
    fn default() -> Self {
        Self {
            enabled: false,
            luma: ToneCurve::identity(),
            red: ToneCurve::identity(),
            green: ToneCurve::identity(),
            blue: ToneCurve::identity(),
        }
    }
}

/// One band of the 8-band HSL mixer. All values are offsets in `[-1, 1]`
/// with 0 meaning no change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HslBand {
    /// Hue shift, as a fraction of the band spacing.
    pub hue: f32,
    /// Saturation offset.
    pub saturation: f32,
    /// Luminance offset.
    pub luminance: f32,
}

impl HslBand {
    /// True when the band changes nothing.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.hue == 0.0 && self.saturation == 0.0 && self.luminance == 0.0
    }
}

/// One color grading wheel: a hue/strength tint plus a luminance trim.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GradeWheel {
    /// Tint hue in degrees `[0, 360)`.
    pub hue: f32,
    /// Tint strength in `[0, 1]`; 0 disables the wheel.
    pub saturation: f32,
    /// Luminance trim in `[-1, 1]`.
    pub luminance: f32,
}

impl GradeWheel {
    /// True when the wheel changes nothing.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.saturation == 0.0 && self.luminance == 0.0
    }
}

/// Three-band color grading: shadow/midtone/highlight wheels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorGrading {
    /// Shadow wheel.
    pub shadows: GradeWheel,
    /// Midtone wheel.
    pub midtones: GradeWheel,
    /// Highlight wheel.
    pub highlights: GradeWheel,
    /// Zone overlap softness in `[0, 1]`.
    pub blending: f32,
}

impl ColorGrading {
    /// True when no wheel changes anything.
    pub fn is_identity(&self) -> bool {
        self.shadows.is_identity() && self.midtones.is_identity() && self.highlights.is_identity()
    }
}

impl Default for ColorGrading {
    fn default() -> Self {
        Self {
            shadows: GradeWheel::default(),
            midtones: GradeWheel::default(),
            highlights: GradeWheel::default(),
            blending: 0.5,
        }
    }
}

/// Source orientation applied before any tonal work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// As decoded.
    #[default]
    Normal,
    /// 90° clockwise.
    Rotate90,
    /// 180°.
    Rotate180,
    /// 270° clockwise.
    Rotate270,
    /// Mirrored horizontally.
    FlipHorizontal,
    /// Mirrored vertically.
    FlipVertical,
}

/// An immutable snapshot of every user-tunable adjustment.
///
/// Sliders are normalized to `[-1, 1]` with 0 as identity unless noted.
/// `Default` is the identity snapshot: rendering it reproduces the source
/// (modulo output encoding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParameters {
    // Tone base
    /// Exposure in stops; +1 doubles brightness.
    pub exposure: f32,
    /// Pivoted contrast.
    pub contrast: f32,
    /// Highlight recovery/boost.
    pub highlights: f32,
    /// Shadow lift/crush.
    pub shadows: f32,
    /// White point trim.
    pub whites: f32,
    /// Black point trim.
    pub blacks: f32,

    // Curves
    /// Per-channel tone curves.
    pub curves: ToneCurveSet,

    // Color
    /// White balance warm/cool.
    pub temperature: f32,
    /// White balance green/magenta.
    pub tint: f32,
    /// Uniform saturation.
    pub saturation: f32,
    /// Saturation weighted toward muted colors.
    pub vibrance: f32,
    /// 8-band HSL mixer.
    pub hsl: [HslBand; HSL_BAND_COUNT],
    /// Shadow/midtone/highlight grading wheels.
    pub grading: ColorGrading,

    // Effects
    /// Edge-preserving local contrast.
    pub clarity: f32,
    /// High-frequency local contrast.
    pub texture: f32,
    /// Atmospheric haze removal (negative adds haze).
    pub dehaze: f32,
    /// Vignette strength; negative darkens corners, positive brightens.
    pub vignette_amount: f32,
    /// Film grain strength in `[0, 1]`.
    pub grain_amount: f32,
    /// Grain noise seed; changing it re-rolls the grain pattern.
    pub grain_seed: u32,

    // Details
    /// Unsharp-mask strength in `[0, 1]`.
    pub sharpening: f32,
    /// Unsharp-mask radius in pixels.
    pub sharpen_radius: f32,
    /// Edge-preserving noise reduction strength in `[0, 1]`.
    pub noise_reduction: f32,

    // Geometry
    /// Rotation/mirror applied to the source.
    pub orientation: Orientation,
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            curves: ToneCurveSet::default(),
            temperature: 0.0,
            tint: 0.0,
            saturation: 0.0,
            vibrance: 0.0,
            hsl: [HslBand::default(); HSL_BAND_COUNT],
            grading: ColorGrading::default(),
            clarity: 0.0,
            texture: 0.0,
            dehaze: 0.0,
            vignette_amount: 0.0,
            grain_amount: 0.0,
            grain_seed: 0,
            sharpening: 0.0,
            sharpen_radius: 1.5,
            noise_reduction: 0.0,
            orientation: Orientation::Normal,
        }
    }
}

impl AdjustmentParameters {
    /// The identity snapshot.
    pub fn identity() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_structurally_equal() {
        let a = AdjustmentParameters::default();
        let b = AdjustmentParameters::default();
        assert_eq!(a, b);
    }

    #[test]
    fn test_array_contents_participate_in_equality() {
        let a = AdjustmentParameters::default();
        let mut b = a.clone();
        b.hsl[3].saturation = 0.2;
        assert_ne!(a, b);

        let mut c = a.clone();
        c.curves.red.points.push(CurvePoint::new(0.5, 0.6));
        assert_ne!(a, c);
    }

    #[test]
    fn test_curve_points_sorted_on_construction() {
        let curve = ToneCurve::new(vec![
            CurvePoint::new(1.0, 1.0),
            CurvePoint::new(0.0, 0.1),
            CurvePoint::new(0.5, 0.4),
        ]);
        let xs: Vec<f32> = curve.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_disabled_curves_are_identity() {
        let mut set = ToneCurveSet::default();
        set.red = ToneCurve::new(vec![CurvePoint::new(0.0, 0.2), CurvePoint::new(1.0, 1.0)]);
        assert!(set.is_identity(), "disabled set ignores its curves");
        set.enabled = true;
        assert!(!set.is_identity());
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut params = AdjustmentParameters::default();
        params.exposure = 0.75;
        params.hsl[2].hue = -0.3;
        params.curves.enabled = true;
        params.curves.luma = ToneCurve::new(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(0.4, 0.5),
            CurvePoint::new(1.0, 1.0),
        ]);

        let json = serde_json::to_string(&params).unwrap();
        let back: AdjustmentParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
