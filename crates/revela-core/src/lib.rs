//! # revela-core
//!
//! Core buffer types for the revela photo adjustment engine.
//!
//! This crate provides the containers every other revela crate operates on:
//!
//! - [`LinearImage`] - Planar f32 RGB buffer in linear light
//! - [`Rgba8Buffer`] - Interleaved 8-bit display/export buffer
//! - [`CfaImage`] - Single-channel Bayer mosaic straight off the sensor
//!
//! # Example
//!
//! ```rust
//! use revela_core::LinearImage;
//!
//! let mut img = LinearImage::new(64, 64);
//! img.set_pixel(10, 10, [0.5, 0.25, 0.125]);
//! assert_eq!(img.pixel(10, 10), [0.5, 0.25, 0.125]);
//! ```

#![warn(missing_docs)]

mod cfa;
mod error;
mod image;
mod metadata;

pub use cfa::{CfaColor, CfaImage, CfaPattern};
pub use error::{CoreError, CoreResult};
pub use image::{LinearImage, Rgba8Buffer};
pub use metadata::SourceMetadata;

/// Rec.709 luminance weight for the red channel.
pub const LUMA_R: f32 = 0.2126;
/// Rec.709 luminance weight for the green channel.
pub const LUMA_G: f32 = 0.7152;
/// Rec.709 luminance weight for the blue channel.
pub const LUMA_B: f32 = 0.0722;

/// Rec.709 luminance of an RGB triplet.
#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2]
}
