//! Tone curve evaluation.
//!
//! Control points are fitted with a monotone cubic Hermite spline
//! (Fritsch–Carlson tangents), so a curve whose points never decrease
//! cannot oscillate or overshoot between them. Evaluation goes through a
//! prerendered lookup table per channel; fitting happens once per
//! parameter change, the per-pixel cost is one table lerp.
//!
//! Inputs above 1.0 continue past the last table entry with unit slope,
//! preserving highlight headroom for the stages that follow.

use revela_core::LinearImage;
use revela_params::{ToneCurve, ToneCurveSet};

use crate::parallel::par_map_pixels;

/// Number of entries in a prerendered curve table.
pub const LUT_SIZE: usize = 4096;

/// A fitted, prerendered tone curve.
#[derive(Debug, Clone)]
pub struct CurveLut {
    table: Vec<f32>,
}

impl CurveLut {
    /// Fits and prerenders a curve.
    ///
    /// Degenerate point lists (fewer than two points) prerender as
    /// identity.
    pub fn new(curve: &ToneCurve) -> Self {
        let spline = MonotoneSpline::fit(curve);
        let scale = 1.0 / (LUT_SIZE - 1) as f32;
        let table = (0..LUT_SIZE)
            .map(|i| spline.eval(i as f32 * scale))
            .collect();
        Self { table }
    }

    /// Evaluates the curve at `v`.
    #[inline]
    pub fn eval(&self, v: f32) -> f32 {
        if v <= 0.0 {
            return self.table[0];
        }
        if v >= 1.0 {
            // Continue with unit slope above the defined domain.
            return self.table[LUT_SIZE - 1] + (v - 1.0);
        }
        let pos = v * (LUT_SIZE - 1) as f32;
        let i = pos as usize;
        let frac = pos - i as f32;
        let a = self.table[i];
        let b = self.table[(i + 1).min(LUT_SIZE - 1)];
        a + (b - a) * frac
    }
}

/// Prerendered data for a full curve set.
///
/// Identity curves skip fitting entirely; when every curve is identity
/// the whole prerender is a bypass.
#[derive(Debug, Clone)]
pub struct CurveSetPreRender {
    luma: Option<CurveLut>,
    red: Option<CurveLut>,
    green: Option<CurveLut>,
    blue: Option<CurveLut>,
}

impl CurveSetPreRender {
    /// Fits every non-identity curve in the set.
    pub fn new(set: &ToneCurveSet) -> Self {
        if !set.enabled {
            return Self::bypass();
        }
        let fit = |c: &ToneCurve| (!c.is_identity()).then(|| CurveLut::new(c));
        Self {
            luma: fit(&set.luma),
            red: fit(&set.red),
            green: fit(&set.green),
            blue: fit(&set.blue),
        }
    }

    fn bypass() -> Self {
        Self {
            luma: None,
            red: None,
            green: None,
            blue: None,
        }
    }

    /// True when no curve changes anything.
    #[inline]
    pub fn is_bypass(&self) -> bool {
        self.luma.is_none() && self.red.is_none() && self.green.is_none() && self.blue.is_none()
    }

    /// Applies the curve set to one pixel.
    ///
    /// The composite (luma) curve runs first on all three channels, then
    /// each per-channel curve.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = rgb;
        if let Some(luma) = &self.luma {
            for c in &mut out {
                *c = luma.eval(*c);
            }
        }
        if let Some(red) = &self.red {
            out[0] = red.eval(out[0]);
        }
        if let Some(green) = &self.green {
            out[1] = green.eval(out[1]);
        }
        if let Some(blue) = &self.blue {
            out[2] = blue.eval(out[2]);
        }
        out
    }
}

/// Applies a curve set to an image in place.
pub fn apply_curves(img: &mut LinearImage, set: &ToneCurveSet) {
    let pre = CurveSetPreRender::new(set);
    if pre.is_bypass() {
        return;
    }
    par_map_pixels(img, move |rgb| pre.apply(rgb));
}

/// Monotone piecewise cubic Hermite interpolant.
struct MonotoneSpline {
    xs: Vec<f32>,
    ys: Vec<f32>,
    tangents: Vec<f32>,
}

impl MonotoneSpline {
    /// Fits the spline with Fritsch–Carlson tangent limiting.
    fn fit(curve: &ToneCurve) -> Self {
        let pts = &curve.points;
        if pts.len() < 2 {
            // Identity fallback.
            return Self {
                xs: vec![0.0, 1.0],
                ys: vec![0.0, 1.0],
                tangents: vec![1.0, 1.0],
            };
        }

        let xs: Vec<f32> = pts.iter().map(|p| p.x).collect();
        let ys: Vec<f32> = pts.iter().map(|p| p.y).collect();
        let n = xs.len();

        // Secant slopes per segment.
        let mut secants = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            let dx = (xs[i + 1] - xs[i]).max(1e-6);
            secants.push((ys[i + 1] - ys[i]) / dx);
        }

        // Initial tangents: endpoint secants, interior averages.
        let mut tangents = vec![0.0f32; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for i in 1..n - 1 {
            if secants[i - 1] * secants[i] <= 0.0 {
                // Local extremum: flat tangent keeps monotonicity.
                tangents[i] = 0.0;
            } else {
                tangents[i] = (secants[i - 1] + secants[i]) * 0.5;
            }
        }

        // Fritsch–Carlson limiting: keep alpha² + beta² inside the circle
        // of radius 3 so each segment stays monotone.
        for i in 0..n - 1 {
            if secants[i] == 0.0 {
                tangents[i] = 0.0;
                tangents[i + 1] = 0.0;
                continue;
            }
            let alpha = tangents[i] / secants[i];
            let beta = tangents[i + 1] / secants[i];
            let norm2 = alpha * alpha + beta * beta;
            if norm2 > 9.0 {
                let tau = 3.0 / norm2.sqrt();
                tangents[i] = tau * alpha * secants[i];
                tangents[i + 1] = tau * beta * secants[i];
            }
        }

        Self { xs, ys, tangents }
    }

    /// Evaluates at `x`, clamping to the endpoint values outside the
    /// control-point range.
    fn eval(&self, x: f32) -> f32 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        // Binary search for the containing segment.
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] <= x {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let dx = (self.xs[hi] - self.xs[lo]).max(1e-6);
        let t = (x - self.xs[lo]) / dx;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.ys[lo]
            + h10 * dx * self.tangents[lo]
            + h01 * self.ys[hi]
            + h11 * dx * self.tangents[hi]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revela_params::CurvePoint;

    fn curve(points: &[(f32, f32)]) -> ToneCurve {
        ToneCurve::new(points.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect())
    }

    #[test]
    fn test_identity_curve_is_identity() {
        let lut = CurveLut::new(&ToneCurve::identity());
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            assert!((lut.eval(v) - v).abs() < 1e-3, "v={v}");
        }
    }

    #[test]
    fn test_passes_through_control_points() {
        let c = curve(&[(0.0, 0.0), (0.25, 0.4), (0.75, 0.6), (1.0, 1.0)]);
        let lut = CurveLut::new(&c);
        for p in &c.points {
            assert!((lut.eval(p.x) - p.y).abs() < 1e-2, "at x={}", p.x);
        }
    }

    #[test]
    fn test_monotone_points_give_monotone_curve() {
        // An aggressive S-curve; the classic case where a natural cubic
        // spline would overshoot.
        let c = curve(&[(0.0, 0.0), (0.3, 0.05), (0.5, 0.5), (0.7, 0.95), (1.0, 1.0)]);
        let lut = CurveLut::new(&c);
        let mut prev = lut.eval(0.0);
        for i in 1..=400 {
            let v = lut.eval(i as f32 / 400.0);
            assert!(v >= prev - 1e-5, "non-monotone at {i}");
            prev = v;
        }
        // And never outside the point range on [0,1].
        for i in 0..=400 {
            let v = lut.eval(i as f32 / 400.0);
            assert!((-1e-4..=1.0 + 1e-4).contains(&v));
        }
    }

    #[test]
    fn test_overbright_keeps_headroom() {
        let lut = CurveLut::new(&ToneCurve::identity());
        assert!((lut.eval(2.5) - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_disabled_set_is_bypass() {
        let mut set = ToneCurveSet::default();
        set.red = curve(&[(0.0, 0.3), (1.0, 1.0)]);
        let pre = CurveSetPreRender::new(&set);
        assert!(pre.is_bypass());

        set.enabled = true;
        let pre = CurveSetPreRender::new(&set);
        assert!(!pre.is_bypass());
    }

    #[test]
    fn test_luma_then_channel_order() {
        // Two-point curves are exactly linear under the spline, so the
        // composition is easy to predict.
        let mut set = ToneCurveSet::default();
        set.enabled = true;
        set.luma = curve(&[(0.0, 0.2), (1.0, 1.0)]);
        set.red = curve(&[(0.0, 0.5), (1.0, 1.0)]);
        let pre = CurveSetPreRender::new(&set);

        let out = pre.apply([0.25, 0.25, 0.25]);
        // Green/blue see only the luma curve: 0.2 + 0.25 * 0.8 = 0.4.
        assert!((out[1] - 0.4).abs() < 1e-2, "green={}", out[1]);
        // Red sees luma (0.25 → 0.4) then its own curve (0.5 + 0.4/2).
        assert!((out[0] - 0.7).abs() < 1e-2, "red={}", out[0]);
    }

    #[test]
    fn test_apply_curves_in_place() {
        let mut set = ToneCurveSet::default();
        set.enabled = true;
        set.luma = curve(&[(0.0, 0.1), (1.0, 1.0)]);
        let mut img = LinearImage::filled(8, 8, [0.0, 0.0, 0.0]);
        apply_curves(&mut img, &set);
        assert!((img.pixel(3, 3)[0] - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_bypass_leaves_image_untouched() {
        let set = ToneCurveSet::default();
        let mut img = LinearImage::filled(4, 4, [0.3, 0.5, 0.7]);
        let before = img.clone();
        apply_curves(&mut img, &set);
        assert_eq!(img, before);
    }
}
