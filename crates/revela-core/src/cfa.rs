//! Bayer color filter array buffers.
//!
//! A sensor behind a Bayer mosaic records one color sample per photosite.
//! [`CfaImage`] carries that single-channel data plus the 2×2 pattern
//! layout; the demosaic kernels in `revela-ops` reconstruct full RGB.

use crate::error::{CoreError, CoreResult};

/// Which color a CFA photosite samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaColor {
    /// Red photosite.
    Red,
    /// Green photosite.
    Green,
    /// Blue photosite.
    Blue,
}

/// 2×2 Bayer pattern layout, named by the top-left quad reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CfaPattern {
    /// Red/Green over Green/Blue (the most common layout).
    #[default]
    Rggb,
    /// Blue/Green over Green/Red.
    Bggr,
    /// Green/Red over Blue/Green.
    Grbg,
    /// Green/Blue over Red/Green.
    Gbrg,
}

impl CfaPattern {
    /// The color sampled at absolute image coordinates `(x, y)`.
    #[inline]
    pub fn color_at(self, x: u32, y: u32) -> CfaColor {
        let quad = ((y & 1) << 1) | (x & 1);
        // Quad index: 0 = top-left, 1 = top-right, 2 = bottom-left, 3 = bottom-right.
        match (self, quad) {
            (Self::Rggb, 0) | (Self::Bggr, 3) | (Self::Grbg, 1) | (Self::Gbrg, 2) => CfaColor::Red,
            (Self::Rggb, 3) | (Self::Bggr, 0) | (Self::Grbg, 2) | (Self::Gbrg, 1) => CfaColor::Blue,
            _ => CfaColor::Green,
        }
    }
}

/// Single-channel Bayer mosaic image.
///
/// Samples are normalized to `[0, 1]` linear light, row-major.
#[derive(Clone)]
pub struct CfaImage {
    width: u32,
    height: u32,
    data: Vec<f32>,
    pattern: CfaPattern,
}

impl CfaImage {
    /// Creates a mosaic image from raw sensor samples.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaneSizeMismatch`] if `data` does not hold
    /// exactly `width * height` samples.
    pub fn from_samples(
        width: u32,
        height: u32,
        pattern: CfaPattern,
        data: Vec<f32>,
    ) -> CoreResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(CoreError::PlaneSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        if width < 2 || height < 2 {
            return Err(CoreError::InvalidDimensions(
                "mosaic must be at least 2x2".into(),
            ));
        }
        Ok(Self { width, height, data, pattern })
    }

    /// Mosaic width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mosaic height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The 2×2 pattern layout.
    #[inline]
    pub fn pattern(&self) -> CfaPattern {
        self.pattern
    }

    /// Raw samples, row-major.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Sample at `(x, y)`.
    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        debug_assert!(x < self.width && y < self.height, "sample out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Sample at `(x, y)` with coordinates clamped to the image bounds.
    #[inline]
    pub fn sample_clamped(&self, x: i64, y: i64) -> f32 {
        let cx = x.clamp(0, self.width as i64 - 1) as u32;
        let cy = y.clamp(0, self.height as i64 - 1) as u32;
        self.sample(cx, cy)
    }

    /// The color this mosaic samples at `(x, y)`.
    #[inline]
    pub fn color_at(&self, x: u32, y: u32) -> CfaColor {
        self.pattern.color_at(x, y)
    }
}

impl std::fmt::Debug for CfaImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CfaImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pattern", &self.pattern)
            .finish()
    }
}
