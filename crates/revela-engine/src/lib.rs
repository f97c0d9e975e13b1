//! # revela-engine
//!
//! The incremental render orchestrator for the revela adjustment
//! pipeline: processing plans, the three-level cache hierarchy, edit
//! coalescing, and the session-owned [`RenderEngine`].
//!
//! An edit produces a parameter snapshot; the engine diffs it against
//! the previous one, re-runs only the contiguous suffix of stages the
//! change invalidates, reuses cached upstream outputs, and encodes the
//! result for display. Exports run the same stage kernels at full
//! resolution on a separate, non-cached path.
//!
//! # Example
//!
//! ```rust
//! use revela_core::LinearImage;
//! use revela_engine::{EngineConfig, MemorySource, RenderEngine};
//! use revela_params::AdjustmentParameters;
//!
//! let mut engine = RenderEngine::new(EngineConfig::builder().gpu(false).build());
//! engine
//!     .load_source(&MemorySource::from_image(LinearImage::filled(64, 48, [0.3, 0.3, 0.3])))
//!     .unwrap();
//!
//! let mut params = AdjustmentParameters::default();
//! params.exposure = 0.5;
//! let report = engine.render_preview(&params, false, None).unwrap();
//! assert_eq!(report.stages_executed.len(), 5);
//! ```

#![warn(missing_docs)]

mod cache;
mod coalesce;
mod config;
mod engine;
mod error;
mod plan;
mod source;

pub use cache::{CacheHierarchy, CacheStats, RenderKey};
pub use coalesce::{CancelToken, EditCoalescer};
pub use config::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_L1_BUDGET, DEFAULT_L2_SLOTS, DEFAULT_PREVIEW_LADDER,
    EngineConfig, EngineConfigBuilder,
};
pub use engine::{EngineStats, RenderEngine, RenderReport, RenderState};
pub use error::{EngineError, EngineResult};
pub use plan::ProcessingPlan;
pub use source::{MemorySource, RawSource, SourceProvider};
