//! Orientation transforms.
//!
//! Rotations and mirrors applied to the source before any tonal work, so
//! every downstream stage and cache entry sees the final geometry.

use revela_core::LinearImage;
use revela_params::Orientation;

use crate::parallel::par_produce_pixels;

/// Applies an orientation to an image, returning the transformed copy.
///
/// [`Orientation::Normal`] returns a plain clone.
pub fn apply_orientation(src: &LinearImage, orientation: Orientation) -> LinearImage {
    let (w, h) = src.dimensions();
    let (out_w, out_h) = match orientation {
        Orientation::Rotate90 | Orientation::Rotate270 => (h, w),
        _ => (w, h),
    };

    if orientation == Orientation::Normal {
        return src.clone();
    }

    let mut out = LinearImage::new(out_w, out_h);
    par_produce_pixels(&mut out, |x, y| {
        let (sx, sy) = match orientation {
            Orientation::Normal => (x, y),
            // Destination (x, y) pulled from the source pixel that lands
            // there under a clockwise rotation.
            Orientation::Rotate90 => (y, h - 1 - x),
            Orientation::Rotate180 => (w - 1 - x, h - 1 - y),
            Orientation::Rotate270 => (w - 1 - y, x),
            Orientation::FlipHorizontal => (w - 1 - x, y),
            Orientation::FlipVertical => (x, h - 1 - y),
        };
        src.pixel(sx, sy)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×3 test image with a unique value per pixel.
    fn numbered() -> LinearImage {
        let mut img = LinearImage::new(2, 3);
        for y in 0..3 {
            for x in 0..2 {
                let v = (y * 2 + x) as f32;
                img.set_pixel(x, y, [v, v, v]);
            }
        }
        img
    }

    #[test]
    fn normal_is_clone() {
        let img = numbered();
        assert_eq!(apply_orientation(&img, Orientation::Normal), img);
    }

    #[test]
    fn rotate90_swaps_dimensions() {
        let img = numbered();
        let out = apply_orientation(&img, Orientation::Rotate90);
        assert_eq!(out.dimensions(), (3, 2));
        // Top-left of the source becomes top-right.
        assert_eq!(out.pixel(2, 0), img.pixel(0, 0));
        // Bottom-left becomes top-left.
        assert_eq!(out.pixel(0, 0), img.pixel(0, 2));
    }

    #[test]
    fn rotate180_reverses_both_axes() {
        let img = numbered();
        let out = apply_orientation(&img, Orientation::Rotate180);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(out.pixel(0, 0), img.pixel(1, 2));
        assert_eq!(out.pixel(1, 2), img.pixel(0, 0));
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let img = numbered();
        let mut out = img.clone();
        for _ in 0..4 {
            out = apply_orientation(&out, Orientation::Rotate90);
        }
        assert_eq!(out, img);
    }

    #[test]
    fn rotate90_then_270_is_identity() {
        let img = numbered();
        let out = apply_orientation(&apply_orientation(&img, Orientation::Rotate90), Orientation::Rotate270);
        assert_eq!(out, img);
    }

    #[test]
    fn flips_are_involutions() {
        let img = numbered();
        for flip in [Orientation::FlipHorizontal, Orientation::FlipVertical] {
            let twice = apply_orientation(&apply_orientation(&img, flip), flip);
            assert_eq!(twice, img, "{flip:?}");
        }
    }

    #[test]
    fn flip_horizontal_mirrors_rows() {
        let img = numbered();
        let out = apply_orientation(&img, Orientation::FlipHorizontal);
        assert_eq!(out.pixel(0, 1), img.pixel(1, 1));
        assert_eq!(out.pixel(1, 1), img.pixel(0, 1));
    }
}
