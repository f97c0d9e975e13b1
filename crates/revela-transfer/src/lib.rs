//! # revela-transfer
//!
//! Conversion between linear light and the 8-bit sRGB output domain:
//!
//! - [`srgb`] - the IEC 61966-2-1 piecewise transfer functions and the
//!   plain (round-to-nearest) 8-bit encode
//! - [`dither`] - Floyd–Steinberg error-diffusion encode for banding-free
//!   gradients at low bit depths

#![warn(missing_docs)]

pub mod dither;
pub mod srgb;

pub use dither::encode_dithered;
pub use srgb::{encode_image, linear_to_srgb, srgb_to_linear};
