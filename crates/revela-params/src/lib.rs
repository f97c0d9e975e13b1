//! # revela-params
//!
//! The user-tunable adjustment model and everything the pipeline derives
//! from it:
//!
//! - [`AdjustmentParameters`] - an immutable snapshot of every slider,
//!   curve, and wheel, with full structural equality
//! - [`ProcessingStage`] - the five ordered pipeline stages and the
//!   static field→stage ownership table
//! - [`stage_hash`] - 128-bit per-stage parameter digests with
//!   fixed-precision float rounding
//! - [`detect_changes`] - the diff that turns two snapshots into the
//!   contiguous suffix of stages that must re-run
//!
//! # Example
//!
//! ```rust
//! use revela_params::{AdjustmentParameters, ProcessingStage, detect_changes};
//!
//! let old = AdjustmentParameters::default();
//! let mut new = old.clone();
//! new.sharpening = 0.6;
//!
//! let delta = detect_changes(Some(&old), &new);
//! assert_eq!(delta.start_stage, Some(ProcessingStage::Details));
//! assert_eq!(delta.stages_to_recompute, vec![ProcessingStage::Details]);
//! ```

#![warn(missing_docs)]

mod diff;
mod hash;
mod params;
mod stage;

pub use diff::{ParameterDelta, detect_changes};
pub use hash::{OutputId, ParameterHash, stage_hash};
pub use params::{
    AdjustmentParameters, ColorGrading, CurvePoint, GradeWheel, HSL_BAND_COUNT, HslBand,
    Orientation, ToneCurve, ToneCurveSet,
};
pub use stage::{ParameterField, ProcessingStage};
