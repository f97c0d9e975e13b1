//! # revela-compute
//!
//! GPU compute backend and kernel dispatch for the revela pipeline.
//!
//! The only on-device kernel is the bilateral filter — the most
//! expensive per-pixel operation in the pipeline. [`BilateralDispatcher`]
//! selects between the exact CPU filter, the fast downsample path, and
//! the wgpu compute path per call, based on image size and the
//! configured thresholds, and tracks usage statistics per path.
//!
//! The GPU path is strictly opportunistic: any adapter, device, or
//! dispatch failure falls back to the CPU transparently and the call
//! still succeeds. Disabling the `wgpu` feature removes the GPU path at
//! compile time; the dispatcher API is unchanged.

#![warn(missing_docs)]

mod dispatch;
mod error;
mod shaders;

#[cfg(feature = "wgpu")]
mod gpu;

pub use dispatch::{BilateralDispatcher, BilateralPath, DispatchConfig, PathStats, UsageStats};
pub use error::{ComputeError, ComputeResult};

#[cfg(feature = "wgpu")]
pub use gpu::GpuBilateral;
